use crate::dto::HealthRes;

/// Health service shared by every binary that serves HTTP.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static health check; no state is consulted.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "MediBook is alive".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_health_reports_ok() {
        let res = HealthService::check_health();
        assert!(res.ok);
        assert_eq!(res.message, "MediBook is alive");
    }
}
