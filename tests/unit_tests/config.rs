use sumfact::config::{DofQuadLimits, KernelConfig};
use sumfact::error::PaError;

#[test]
fn default_limits() {
    let limits = DofQuadLimits::default();
    assert_eq!(limits.max_d1d, 14);
    assert_eq!(limits.max_q1d, 14);
    assert!(!KernelConfig::default().use_shared_memory);
}

#[test]
fn limits_are_checked() {
    let limits = DofQuadLimits { max_d1d: 4, max_q1d: 5 };
    assert_eq!(limits.check_dofs(4), Ok(()));
    assert_eq!(limits.check_dofs(5), Err(PaError::DofLimitExceeded { d1d: 5, max_d1d: 4 }));
    assert_eq!(limits.check_quadrature(6), Err(PaError::QuadLimitExceeded { q1d: 6, max_q1d: 5 }));
    assert_eq!(limits.check_quadrature(0), Err(PaError::EmptyBasis));
}

#[test]
fn config_from_partial_json() {
    let config: KernelConfig = serde_json::from_str(r#"{ "use_shared_memory": true }"#).unwrap();
    assert_eq!(config, KernelConfig::default().with_shared_memory(true));

    let config: KernelConfig = serde_json::from_str(r#"{ "limits": { "max_q1d": 8 } }"#).unwrap();
    assert_eq!(config.limits, DofQuadLimits { max_d1d: 14, max_q1d: 8 });
    assert!(!config.use_shared_memory);
}
