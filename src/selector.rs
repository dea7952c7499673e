//! Ordered-candidate element location.
//!
//! The target UI's markup is not a contract: class names churn between
//! releases and text labels outlive attributes. So no single locator is
//! trusted. Each logical role ("title field", "publish button") is declared
//! as an ordered chain of alternative locators, most specific first, and
//! resolution walks the chain strictly in order - candidates are never
//! raced, because a slow-to-render specific candidate must still beat a
//! fast generic one.

use std::future::Future;

use crate::error::{EngineError, Result};

/// One way of finding an element, compiled to a concrete query at use time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Raw CSS selector.
    Css(String),
    /// Any element whose visible text contains the string.
    Text(String),
    /// Element of a given tag whose text contains the string.
    TextIn(&'static str, String),
    /// Input matched by a placeholder substring.
    Placeholder(String),
    /// Any element whose attribute value contains the string.
    AttrContains(&'static str, String),
}

/// A compiled query, dispatched to the matching page lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Css(String),
    Xpath(String),
}

impl Locator {
    pub fn css(sel: impl Into<String>) -> Self {
        Locator::Css(sel.into())
    }

    pub fn text(t: impl Into<String>) -> Self {
        Locator::Text(t.into())
    }

    pub fn text_in(tag: &'static str, t: impl Into<String>) -> Self {
        Locator::TextIn(tag, t.into())
    }

    pub fn to_query(&self) -> Query {
        match self {
            Locator::Css(sel) => Query::Css(sel.clone()),
            Locator::Text(t) => Query::Xpath(format!(
                "//*[contains(normalize-space(.), {})]",
                xpath_literal(t)
            )),
            Locator::TextIn(tag, t) => Query::Xpath(format!(
                "//{}[contains(normalize-space(.), {})]",
                tag,
                xpath_literal(t)
            )),
            Locator::Placeholder(p) => Query::Css(format!(r#"input[placeholder*="{}"]"#, p)),
            Locator::AttrContains(attr, v) => Query::Css(format!(r#"[{}*="{}"]"#, attr, v)),
        }
    }
}

/// Quote a string as an XPath 1.0 literal. XPath has no escape character;
/// a text containing both quote kinds must be assembled with `concat()`.
fn xpath_literal(s: &str) -> String {
    if !s.contains('"') {
        format!(r#""{s}""#)
    } else if !s.contains('\'') {
        format!("'{s}'")
    } else {
        let parts: Vec<String> = s.split('"').map(|p| format!(r#""{p}""#)).collect();
        format!("concat({})", parts.join(r#", '"', "#))
    }
}

/// Ordered list of alternative locators for one logical UI role.
#[derive(Debug, Clone)]
pub struct LocatorChain {
    pub role: &'static str,
    pub candidates: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(role: &'static str, candidates: Vec<Locator>) -> Self {
        Self { role, candidates }
    }
}

/// Walk a chain in declared order, handing each candidate to `probe` until
/// one yields a value. The probe owns the per-candidate timeout; this
/// function owns the ordering and the failure.
pub async fn resolve_with<T, F, Fut>(chain: &LocatorChain, mut probe: F) -> Result<T>
where
    F: FnMut(&Locator) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for (idx, candidate) in chain.candidates.iter().enumerate() {
        tracing::debug!(role = chain.role, candidate = idx, "trying locator");
        if let Some(found) = probe(candidate).await {
            tracing::debug!(role = chain.role, candidate = idx, "resolved");
            return Ok(found);
        }
    }
    tracing::warn!(role = chain.role, "no candidate locator resolved");
    Err(EngineError::ElementNotFound { role: chain.role })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> LocatorChain {
        LocatorChain::new(
            "publish_button",
            vec![
                Locator::text("发布"),
                Locator::text_in("button", "发布"),
                Locator::AttrContains("class", "publish".into()),
                Locator::css("button.submit"),
            ],
        )
    }

    #[tokio::test]
    async fn resolves_first_success_in_declared_order() {
        let mut probed = Vec::new();
        let got = resolve_with(&chain(), |loc| {
            probed.push(loc.clone());
            let hit = matches!(loc, Locator::AttrContains(_, _));
            async move { hit.then_some("element") }
        })
        .await
        .unwrap();
        assert_eq!(got, "element");
        // Candidates 1..k-1 were each tried exactly once, none after k.
        assert_eq!(probed.len(), 3);
        assert_eq!(probed[0], Locator::text("发布"));
        assert_eq!(probed[1], Locator::text_in("button", "发布"));
    }

    #[tokio::test]
    async fn exhausted_chain_names_the_role() {
        let err = resolve_with::<&str, _, _>(&chain(), |_| async { None })
            .await
            .unwrap_err();
        match err {
            EngineError::ElementNotFound { role } => assert_eq!(role, "publish_button"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn locators_compile_to_queries() {
        assert_eq!(
            Locator::text("下一步").to_query(),
            Query::Xpath(r#"//*[contains(normalize-space(.), "下一步")]"#.into())
        );
        assert_eq!(
            Locator::Placeholder("标题".into()).to_query(),
            Query::Css(r#"input[placeholder*="标题"]"#.into())
        );
        assert_eq!(
            Locator::AttrContains("class", "uploading".into()).to_query(),
            Query::Css(r#"[class*="uploading"]"#.into())
        );
    }

    #[test]
    fn quote_bearing_texts_stay_valid_xpath() {
        // XPath has no backslash escaping; double quotes flip the literal
        // to single quotes.
        assert_eq!(
            Locator::text_in("span", r#"say "hi""#).to_query(),
            Query::Xpath(r#"//span[contains(normalize-space(.), 'say "hi"')]"#.into())
        );
        // Both quote kinds force concat() assembly.
        assert_eq!(
            Locator::text(r#"it's "on""#).to_query(),
            Query::Xpath(
                r#"//*[contains(normalize-space(.), concat("it's ", '"', "on", '"', ""))]"#.into()
            )
        );
    }
}
