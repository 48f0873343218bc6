pub mod bus;
pub mod config;
pub mod correlation {
    pub mod store;
    pub mod sweeper;
}
pub mod domain {
    pub mod payment;
}
pub mod gateways;
pub mod http {
    pub mod handlers {
        pub mod inbox;
        pub mod payments;
    }
}
pub mod inbox {
    pub mod bootstrap;
    pub mod service;
    pub mod signature;
}
pub mod service {
    pub mod orchestrator;
    pub mod status_broadcaster;
}

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<service::orchestrator::PaymentOrchestrator>,
    pub broadcaster: Arc<service::status_broadcaster::StatusBroadcaster>,
    pub inbox: inbox::service::InboxService,
    pub verifier: Arc<inbox::signature::SignatureVerifier>,
}
