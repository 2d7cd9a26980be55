//! Investor records and the CSV format they are exported in.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const INVESTOR_NAME: &str = "Investor name";
pub const WEBSITE: &str = "Website";
pub const GLOBAL_HQ: &str = "Global HQ";
pub const COUNTRIES_OF_INVESTMENT: &str = "Countries of investment";
pub const STAGE_OF_INVESTMENT: &str = "Stage of investment";
pub const INVESTMENT_THESIS: &str = "Investment thesis";
pub const INVESTOR_TYPE: &str = "Investor type";
pub const FIRST_CHEQUE_MINIMUM: &str = "First cheque minimum";
pub const FIRST_CHEQUE_MAXIMUM: &str = "First cheque maximum";

/// One row of the investor dataset keyed by column header.
///
/// Any header is accepted so arbitrary CSV exports can be loaded, the
/// accessors cover the columns that get displayed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvestorRecord(BTreeMap<String, String>);

impl InvestorRecord {
    pub fn from_fields<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Value of `field` or an empty string when the column is absent.
    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn name(&self) -> &str {
        self.get(INVESTOR_NAME)
    }

    pub fn website(&self) -> &str {
        self.get(WEBSITE)
    }

    pub fn headquarters(&self) -> &str {
        self.get(GLOBAL_HQ)
    }

    pub fn countries(&self) -> &str {
        self.get(COUNTRIES_OF_INVESTMENT)
    }

    pub fn stage(&self) -> &str {
        self.get(STAGE_OF_INVESTMENT)
    }

    pub fn thesis(&self) -> &str {
        self.get(INVESTMENT_THESIS)
    }

    pub fn investor_type(&self) -> &str {
        self.get(INVESTOR_TYPE)
    }

    pub fn check_size(&self) -> String {
        format!(
            "{} - {}",
            self.get(FIRST_CHEQUE_MINIMUM),
            self.get(FIRST_CHEQUE_MAXIMUM)
        )
    }
}

// Strip one layer of surrounding double quotes
fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn clean(value: &str) -> String {
    unquote(value.trim()).to_string()
}

/// Splits a data row on commas that are outside of double quotes.
///
/// Quote characters only toggle the quoted state and are never part
/// of a value.
fn split_row(line: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut inside_quotes = false;
    let mut current = String::new();

    for c in line.chars() {
        match c {
            '"' => inside_quotes = !inside_quotes,
            ',' if !inside_quotes => {
                values.push(clean(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    values.push(clean(&current));

    values
}

/// Parses a CSV export where the first line holds the column names.
///
/// Rows with fewer values than headers get empty strings for the
/// missing columns, extra values are dropped and blank lines are
/// skipped.
pub fn parse_csv(csv: &str) -> Vec<InvestorRecord> {
    let mut lines = csv.split('\n');

    // The header row is split naively, quoted commas aren't expected
    // in column names
    let headers: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split(',')
        .map(clean)
        .collect();

    lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut values = split_row(line).into_iter();
            InvestorRecord::from_fields(
                headers
                    .iter()
                    .map(|header| (header.clone(), values.next().unwrap_or_default())),
            )
        })
        .collect()
}

/// The built-in dataset used whenever the real one can't be loaded.
pub fn fallback_investors() -> Vec<InvestorRecord> {
    let rows = [
        [
            "Sequoia Capital",
            "https://www.sequoiacap.com/",
            "Menlo Park, CA",
            "United States, China, India, Europe",
            "Seed, Early, Growth",
            "Technology companies with global potential",
            "Venture Capital",
            "$50K",
            "$1M",
        ],
        [
            "Y Combinator",
            "https://www.ycombinator.com/",
            "Mountain View, CA",
            "Global",
            "Seed",
            "Innovative startups with strong founding teams",
            "Accelerator",
            "$125K",
            "$500K",
        ],
        [
            "Andreessen Horowitz",
            "https://a16z.com/",
            "Menlo Park, CA",
            "United States, Global",
            "Seed, Early, Growth",
            "Software eating the world",
            "Venture Capital",
            "$250K",
            "$15M",
        ],
        [
            "First Round Capital",
            "https://firstround.com/",
            "San Francisco, CA",
            "United States",
            "Seed",
            "Technical founders and innovative products",
            "Venture Capital",
            "$100K",
            "$750K",
        ],
        [
            "Techstars",
            "https://www.techstars.com/",
            "Boulder, CO",
            "Global",
            "Pre-seed, Seed",
            "Industry-focused acceleration programs",
            "Accelerator",
            "$20K",
            "$120K",
        ],
    ];
    let headers = [
        INVESTOR_NAME,
        WEBSITE,
        GLOBAL_HQ,
        COUNTRIES_OF_INVESTMENT,
        STAGE_OF_INVESTMENT,
        INVESTMENT_THESIS,
        INVESTOR_TYPE,
        FIRST_CHEQUE_MINIMUM,
        FIRST_CHEQUE_MAXIMUM,
    ];

    rows.into_iter()
        .map(|row| InvestorRecord::from_fields(headers.into_iter().zip(row)))
        .collect()
}
