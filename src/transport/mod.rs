// Transport module - THE WIRE (abstract)
// Selects and drives the serial, BLE and UDP links that carry SMP packets

mod ble;
mod selector;
mod serial;
mod traits;
mod udp;

pub use traits::{
    // Core trait
    SmpTransport,
    // Link identity
    TransportKind,
    // Errors
    TransportError,
};

pub use selector::{
    build_transport, select_transport, ConfigurationError, TransportDescriptor, TransportOptions,
};

pub use serial::{SerialConfig, SerialTransport, DEFAULT_BAUDRATE, DEFAULT_FRAME_SIZE};

pub use udp::{UdpConfig, UdpTransport, DEFAULT_UDP_MTU, DEFAULT_UDP_PORT};

pub use ble::{
    BleConfig, BleTransport, DEFAULT_BLE_MTU, SMP_CHARACTERISTIC_UUID, SMP_SERVICE_UUID,
};
