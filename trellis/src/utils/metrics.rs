#[cfg(feature = "metrics")]
mod enabled {
    use std::time::Instant;

    use log::debug;

    /// Logs how long it took for this value to get dropped.
    pub struct Metric {
        name: &'static str,
        started_at: Instant,
    }

    impl Metric {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                started_at: Instant::now(),
            }
        }
    }

    impl Drop for Metric {
        fn drop(&mut self) {
            let elapsed = self.started_at.elapsed();

            debug!(
                "{}: {}",
                self.name,
                humantime::format_duration(elapsed)
            );
        }
    }
}

#[cfg(not(feature = "metrics"))]
mod enabled {
    pub struct Metric;

    impl Metric {
        pub fn new(_: &'static str) -> Self {
            Self
        }
    }
}

pub use self::enabled::Metric;

pub fn metric(name: &'static str) -> Metric {
    Metric::new(name)
}
