use anyhow::Result;

use crate::core::AppConfig;
use crate::core::logging::init_tracing;
use crate::investors::{InvestorRecord, select};

/// Formats an investor the way results are shown to founders.
pub fn format_investor(investor: &InvestorRecord) -> String {
    format!(
        "{}\n  location       {}\n  check size     {}\n  stage          {}\n  investor type  {}\n  website        {}",
        investor.name(),
        investor.headquarters(),
        investor.check_size(),
        investor.stage(),
        investor.investor_type(),
        investor.website(),
    )
}

pub fn print_investors(investors: &[InvestorRecord]) {
    println!("\nyour perfect vc matches\n");
    for investor in investors {
        println!("{}\n", format_investor(investor));
    }
}

pub async fn run(count: Option<usize>) -> Result<()> {
    init_tracing(&format!("{}=info", env!("CARGO_CRATE_NAME")));

    let config = AppConfig::default();
    let count = count.unwrap_or(config.recommendation_count);
    let pool = config.dataset.load().await;
    print_investors(&select(&pool, count));

    Ok(())
}
