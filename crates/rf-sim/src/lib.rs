//! RF Device Simulation Library
//!
//! This crate runs emulated NFC devices over the RF packet protocol:
//!
//! - **Framer**: length-prefixed frame transport over any async stream
//! - **T4atDevice**: Type 4A tag device in listen or poll mode
//! - **RfScene**: in-process RF server routing frames between devices
//!
//! # Example
//!
//! ```rust
//! use rf_sim::{DeviceConfig, FrameDecoder};
//!
//! let config: DeviceConfig = serde_json::from_str(r#"{ "poll_interval_ms": 50 }"#).unwrap();
//! assert_eq!(config.poll_timeout_ms, 1000);
//!
//! // Frames arrive in arbitrary chunks
//! let mut decoder = FrameDecoder::new();
//! decoder.push_bytes(&[0x02, 0x00, 0xAA]);
//! assert!(decoder.next_frame().is_none());
//! decoder.push_bytes(&[0xBB]);
//! assert_eq!(decoder.next_frame(), Some(vec![0xAA, 0xBB]));
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod framer;
pub mod scene;

pub use config::DeviceConfig;
pub use device::{DeviceCommand, DeviceEvent, DeviceMode, DeviceState, T4atDevice};
pub use error::{DeviceError, SceneError};
pub use framer::{split, FrameDecoder, RfReader, RfWriter};
pub use scene::RfScene;
