//! The pull-based incident feed the impact loop polls.

use crate::error::IncidentError;
use crate::model::Incident;

/// The out-of-scope persistence backend's read side, as consumed by the
/// impact loop. Left generic rather than `dyn`-boxed: native async
/// trait methods aren't dyn-compatible without an extra boxing layer
/// this engine has no other use for, and the loop only ever needs one
/// concrete source at a time.
pub trait IncidentSource: Send + Sync {
    fn list_incidents(&self) -> impl std::future::Future<Output = Result<Vec<Incident>, IncidentError>> + Send;
}

/// A fixed incident set. Useful for tests and for demos with no real
/// incident backend wired up.
pub struct StaticIncidentSource {
    incidents: Vec<Incident>,
}

impl StaticIncidentSource {
    pub fn new(incidents: Vec<Incident>) -> Self {
        StaticIncidentSource { incidents }
    }
}

impl IncidentSource for StaticIncidentSource {
    async fn list_incidents(&self) -> Result<Vec<Incident>, IncidentError> {
        Ok(self.incidents.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn incident(id: &str) -> Incident {
        Incident {
            id: id.to_string(),
            lat: 50.0,
            lon: 19.0,
            category: "Traffic".to_string(),
            username: "rider".to_string(),
            approved: false,
            reporter_social_score: 30.0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn returns_the_fixed_incident_set_verbatim() {
        let source = StaticIncidentSource::new(vec![incident("i1"), incident("i2")]);
        let incidents = source.list_incidents().await.unwrap();
        assert_eq!(incidents.len(), 2);
    }
}
