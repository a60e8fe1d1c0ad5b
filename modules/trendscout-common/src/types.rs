use std::fmt;

/// Search endpoint every record links to.
pub const SEARCH_BASE_URL: &str = "https://www.google.com/search";

/// Sentinel written when a result count could not be resolved. Retry-eligible.
pub const NOT_AVAILABLE: &str = "N/A";

/// Sentinel written for rows that were never queried because they are not people.
pub const NOT_A_PERSON: &str = "Not a person - skipped";

pub const COL_NAME: &str = "Name";
pub const COL_IS_PERSON: &str = "Is Person";
pub const COL_LINK: &str = "Link";
pub const COL_SEARCH_RESULTS: &str = "Search Results";

// --- SearchResults ---

/// Value of the `Search Results` column once a row has been visited.
///
/// An absent value (`Option::None` on the record) means the row was never
/// visited. `NotAvailable` means it was visited and the lookup failed, so a
/// later run may retry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResults {
    Count(u64),
    NotAvailable,
    NotAPerson,
    /// Anything else found in a run file. Kept verbatim.
    Other(String),
}

impl SearchResults {
    /// Value of a `Search Results` cell. Blank cells were never visited.
    pub fn from_cell(cell: &str) -> Option<Self> {
        if cell.trim().is_empty() {
            None
        } else {
            Some(Self::from(cell.to_string()))
        }
    }

    /// Terminal values mark a row as done. Only `N/A` and blank cells are retried.
    pub fn is_terminal(&self) -> bool {
        match self {
            SearchResults::NotAvailable => false,
            SearchResults::Other(raw) => !raw.trim().is_empty(),
            SearchResults::Count(_) | SearchResults::NotAPerson => true,
        }
    }
}

impl From<String> for SearchResults {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed == NOT_AVAILABLE {
            SearchResults::NotAvailable
        } else if trimmed == NOT_A_PERSON {
            SearchResults::NotAPerson
        } else if let Ok(count) = trimmed.parse::<u64>() {
            SearchResults::Count(count)
        } else {
            SearchResults::Other(raw)
        }
    }
}

impl From<SearchResults> for String {
    fn from(value: SearchResults) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchResults::Count(n) => write!(f, "{n}"),
            SearchResults::NotAvailable => f.write_str(NOT_AVAILABLE),
            SearchResults::NotAPerson => f.write_str(NOT_A_PERSON),
            SearchResults::Other(raw) => f.write_str(raw),
        }
    }
}

// --- Record ---

/// One row of a run file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub is_person: bool,
    pub link: String,
    pub search_results: Option<SearchResults>,
}

impl Record {
    /// A freshly collected row: link derived from the name, not yet enriched.
    pub fn new(name: &str, is_person: bool) -> Result<Self, url::ParseError> {
        Ok(Self {
            name: name.to_string(),
            is_person,
            link: search_link(name)?,
            search_results: None,
        })
    }

    /// Whether stage two already finished this row.
    pub fn is_processed(&self) -> bool {
        self.search_results
            .as_ref()
            .is_some_and(SearchResults::is_terminal)
    }
}

/// Search URL for a name: words joined with `+`, English results, US region.
pub fn search_link(name: &str) -> Result<String, url::ParseError> {
    let query = name.split_whitespace().collect::<Vec<_>>().join(" ");
    let url = url::Url::parse_with_params(
        SEARCH_BASE_URL,
        &[("q", query.as_str()), ("hl", "en"), ("gl", "us")],
    )?;
    Ok(url.into())
}

/// `Is Person` cell text. Common spellings are accepted; blank reads as false.
pub fn parse_person_flag(cell: &str) -> Option<bool> {
    match cell.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

/// `Is Person` as written to new cells.
pub fn person_flag_text(is_person: bool) -> &'static str {
    if is_person {
        "True"
    } else {
        "False"
    }
}
