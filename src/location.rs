use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A location reading attached to captured media
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Reported accuracy in meters; 0 means the source did not report one
    pub accuracy: f32,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub provider: String,
}

/// One source of last-known locations (GPS, network, paired phone...)
#[async_trait]
pub trait LocationSource: Send + Sync {
    fn name(&self) -> &str;
    async fn last_known_fix(&self) -> Option<LocationFix>;
}

/// Something the session can ask for a geotag
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn best_effort_fix(&self) -> Option<LocationFix>;
}

/// Pick the most accurate reading.
///
/// Readings are considered in source order. A reading without accuracy
/// (0) is replaced by the first one that has accuracy; otherwise the
/// lowest accuracy value wins.
pub fn select_best_fix<I>(fixes: I) -> Option<LocationFix>
where
    I: IntoIterator<Item = LocationFix>,
{
    let mut best: Option<LocationFix> = None;

    for fix in fixes {
        best = match best {
            None => Some(fix),
            Some(current) if current.accuracy == 0.0 => {
                if fix.accuracy != 0.0 {
                    Some(fix)
                } else {
                    Some(current)
                }
            }
            Some(current) => {
                if fix.accuracy != 0.0 && fix.accuracy < current.accuracy {
                    Some(fix)
                } else {
                    Some(current)
                }
            }
        };
    }

    best
}

/// Queries every source and keeps the best reading
pub struct BestEffortLocator {
    sources: Vec<Arc<dyn LocationSource>>,
    per_source_timeout: Duration,
}

impl BestEffortLocator {
    pub fn new(per_source_timeout: Duration) -> Self {
        Self {
            sources: Vec::new(),
            per_source_timeout,
        }
    }

    pub fn with_source(mut self, source: Arc<dyn LocationSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

#[async_trait]
impl LocationProvider for BestEffortLocator {
    async fn best_effort_fix(&self) -> Option<LocationFix> {
        let mut fixes = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            match tokio::time::timeout(self.per_source_timeout, source.last_known_fix()).await {
                Ok(Some(fix)) => fixes.push(fix),
                Ok(None) => debug!("Location source '{}' has no fix", source.name()),
                Err(_) => warn!(
                    "Location source '{}' did not answer within {:?}",
                    source.name(),
                    self.per_source_timeout
                ),
            }
        }

        select_best_fix(fixes)
    }
}

/// Source returning a fixed reading
pub struct StaticLocationSource {
    name: String,
    fix: Option<LocationFix>,
}

impl StaticLocationSource {
    pub fn new<S: Into<String>>(name: S, fix: Option<LocationFix>) -> Self {
        Self {
            name: name.into(),
            fix,
        }
    }
}

#[async_trait]
impl LocationSource for StaticLocationSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn last_known_fix(&self) -> Option<LocationFix> {
        self.fix.clone()
    }
}

/// Provider used when geotagging has no backing sources
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn best_effort_fix(&self) -> Option<LocationFix> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(provider: &str, accuracy: f32) -> LocationFix {
        LocationFix {
            latitude: 45.07,
            longitude: 7.69,
            altitude: 240.0,
            accuracy,
            timestamp_ms: 1_700_000_000_000,
            provider: provider.to_string(),
        }
    }

    struct SlowSource;

    #[async_trait]
    impl LocationSource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        async fn last_known_fix(&self) -> Option<LocationFix> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Some(fix("slow", 1.0))
        }
    }

    #[test]
    fn test_lowest_accuracy_wins() {
        let best = select_best_fix(vec![fix("network", 50.0), fix("gps", 5.0), fix("wifi", 20.0)]);
        assert_eq!(best.unwrap().provider, "gps");
    }

    #[test]
    fn test_non_zero_preferred_over_zero() {
        let best = select_best_fix(vec![fix("passive", 0.0), fix("network", 80.0), fix("gps", 5.0)]);
        // the first reading with accuracy replaces the zero one, later readings still compete
        assert_eq!(best.unwrap().provider, "gps");

        let best = select_best_fix(vec![fix("network", 80.0), fix("passive", 0.0)]);
        assert_eq!(best.unwrap().provider, "network");
    }

    #[test]
    fn test_only_zero_accuracy_keeps_first() {
        let best = select_best_fix(vec![fix("a", 0.0), fix("b", 0.0)]);
        assert_eq!(best.unwrap().provider, "a");
        assert!(select_best_fix(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_locator_skips_slow_sources() {
        let locator = BestEffortLocator::new(Duration::from_millis(50))
            .with_source(Arc::new(SlowSource))
            .with_source(Arc::new(StaticLocationSource::new(
                "network",
                Some(fix("network", 30.0)),
            )))
            .with_source(Arc::new(StaticLocationSource::new("gps", None)));
        assert_eq!(locator.source_count(), 3);

        let best = locator.best_effort_fix().await.unwrap();
        assert_eq!(best.provider, "network");
    }

    #[tokio::test]
    async fn test_no_location_provider() {
        assert!(NoLocation.best_effort_fix().await.is_none());
    }
}
