use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, register_int_gauge};

lazy_static! {
    pub(crate) static ref BLOB_FALLBACKS: prometheus::IntCounterVec = register_int_counter_vec!(
        "client_tls_blob_fallbacks",
        "Number of times an in-memory client TLS credential was rejected by the transport and supplied as a file instead",
        &["slot"],
    )
    .unwrap();
    pub(crate) static ref MATERIALIZED_FILES: prometheus::IntGauge = register_int_gauge!(
        "client_tls_materialized_files",
        "Number of temporary files currently holding client TLS credential material",
    )
    .unwrap();
}
