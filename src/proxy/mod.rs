// Proxy module
//
// This module contains all proxy functionality split into focused submodules:
// - address: Address templates mapping requests to remote WebSocket URLs
// - relay: Bidirectional WebSocket message relay
// - websocket: WebSocket upgrade handling and remote dialing
// - passthrough: HTTPS pass-through to the controller
// - frontend: Forwarding to the GUI sandbox
// - router: Static path dispatch
// - http_server: HTTP server setup

pub mod address;
pub mod frontend;
pub mod http_server;
pub mod passthrough;
pub mod relay;
pub mod router;
pub mod websocket;

pub use http_server::serve;
pub use router::Router;
