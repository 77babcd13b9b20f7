//! Parsing of the subject list from the course search form.

use scraper::{Html, Selector};
use std::sync::LazyLock;

static OPTION_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"select[name="sel_subj"] option"#).unwrap());

/// Returns every subject code offered in the search form's subject picker.
pub fn parse_subjects(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&OPTION_SELECTOR)
        .filter_map(|option| option.value().attr("value"))
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subjects() {
        let html = r#"
            <form>
              <select name="sel_subj" multiple>
                <option value="ABST">Aboriginal Studies</option>
                <option value="">Any</option>
                <option value="CPSC">Computer Science</option>
              </select>
              <select name="sel_day"><option value="M">Monday</option></select>
            </form>"#;

        assert_eq!(parse_subjects(html), vec!["ABST", "CPSC"]);
    }
}
