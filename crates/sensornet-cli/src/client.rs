//! Seam between the CLI and the session protocol.

use sensornet::{Connector, QueryKind, SensorReading, SessionError, SessionProtocol, TcpConnector};
use sensornet_config::SessionSettings;

/// Produces one reading per call, running a fresh session each time.
pub(crate) trait ReadingSource {
    fn read(&mut self, kind: QueryKind) -> Result<SensorReading, SessionError>;
}

impl<C: Connector> ReadingSource for SessionProtocol<C> {
    fn read(&mut self, kind: QueryKind) -> Result<SensorReading, SessionError> {
        self.query(kind)
    }
}

/// Builds the production source dialling real TCP endpoints.
pub(crate) fn tcp_source(settings: SessionSettings) -> SessionProtocol<TcpConnector> {
    SessionProtocol::new(TcpConnector::new(settings.transport), settings.session)
}
