//! External drug lookup seam

use crate::normalize::types::MatchKind;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`DrugLookup::lookup`]
pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = crate::Result<LookupOutcome>> + Send + 'a>>;

/// Answer of an external lookup service
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found {
        rxcui: String,
        name: String,
        matched: MatchKind,
    },
    NotFound,
}

/// Remote name → identifier resolution.
///
/// Implementations report transport and service failures as
/// [`crate::Error::LookupUnavailable`]; the normalizer turns those into
/// unresolved drugs.
pub trait DrugLookup: Send + Sync {
    fn lookup<'a>(&'a self, name: &'a str) -> LookupFuture<'a>;

    /// Short name used in logs
    fn service_name(&self) -> &str {
        "external"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapLookup(HashMap<String, String>);

    impl DrugLookup for MapLookup {
        fn lookup<'a>(&'a self, name: &'a str) -> LookupFuture<'a> {
            Box::pin(async move {
                Ok(match self.0.get(name) {
                    Some(id) => LookupOutcome::Found {
                        rxcui: id.clone(),
                        name: name.to_string(),
                        matched: MatchKind::Exact,
                    },
                    None => LookupOutcome::NotFound,
                })
            })
        }
    }

    #[tokio::test]
    async fn test_trait_object_lookup() {
        let lookup: Box<dyn DrugLookup> =
            Box::new(MapLookup(HashMap::from([("aspirin".to_string(), "1191".to_string())])));

        assert!(matches!(
            lookup.lookup("aspirin").await,
            Ok(LookupOutcome::Found { ref rxcui, .. }) if rxcui == "1191"
        ));
        assert!(matches!(lookup.lookup("nothing").await, Ok(LookupOutcome::NotFound)));
        assert_eq!(lookup.service_name(), "external");
    }
}
