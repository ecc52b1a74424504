use anyhow::Result;

use crate::board::{columns, render_board};
use crate::commands::list::FilterArgs;
use crate::models::Issue;

pub fn run(issues: &[Issue], args: &FilterArgs<'_>) -> Result<()> {
    let filter = args.to_filter()?;
    let cols = columns(issues, &filter);
    print!("{}", render_board(&cols));
    if !filter.is_empty() {
        let shown: usize = cols.iter().map(|c| c.len()).sum();
        println!("\nShowing {} of {} issues", shown, issues.len());
    }
    Ok(())
}
