//! Session bus registration for the MPRIS2 service.

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::service::{PlayerInterface, RootInterface};
use crate::{BUS_NAME_PREFIX, MPRIS_PATH};
use log::info;
use std::sync::Arc;
use zbus::Connection;

/// Claims the per-instance bus identity and exposes the MPRIS2 object
pub struct Registrar {
    bridge: Arc<Bridge>,
    bus_name: String,
    connection: Option<Connection>,
}

impl Registrar {
    /// The instance identity is decided at startup and injected here.
    pub fn new(bridge: Arc<Bridge>, identity: &str) -> Self {
        Self {
            bridge,
            bus_name: format!("{BUS_NAME_PREFIX}{identity}"),
            connection: None,
        }
    }

    /// Connect to the session bus, export the object and claim the name.
    /// Re-acquiring with a live connection only re-requests the name.
    pub async fn acquire(&mut self) -> Result<(), BridgeError> {
        if let Some(connection) = &self.connection {
            connection.request_name(self.bus_name.as_str()).await?;
            return Ok(());
        }
        let connection = zbus::connection::Builder::session()?
            .serve_at(MPRIS_PATH, RootInterface::new(self.bridge.clone()))?
            .serve_at(MPRIS_PATH, PlayerInterface::new(self.bridge.clone()))?
            .name(self.bus_name.as_str())?
            .build()
            .await?;
        info!("claimed bus name {}", self.bus_name);
        self.bridge.attach_connection(connection.clone());
        self.connection = Some(connection);
        Ok(())
    }

    /// Unregister the object and give the name back.
    pub async fn release(&mut self) -> Result<(), BridgeError> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        connection
            .object_server()
            .remove::<PlayerInterface, _>(MPRIS_PATH)
            .await?;
        connection
            .object_server()
            .remove::<RootInterface, _>(MPRIS_PATH)
            .await?;
        connection.release_name(self.bus_name.as_str()).await?;
        info!("released bus name {}", self.bus_name);
        Ok(())
    }
}
