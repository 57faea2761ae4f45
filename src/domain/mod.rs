//! Domain layer: the payment entity, its state machine, and the ports the
//! orchestrator consumes (store, gateway, notification sink).

pub mod payment;
pub mod ports;
pub mod request;
