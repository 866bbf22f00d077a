//! Bit packing for statecast packets.
//!
//! [`BitWriter`] packs bits most significant first and writes multi-byte
//! integers little-endian; [`BitReader`] mirrors it and reports truncated
//! or malformed input as [`BitError`] instead of panicking. The varint
//! helpers size id lists and baseline ages before anything is written.
//!
//! ```
//! use bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_bool(true);
//! writer.write_bits(42, 7).unwrap();
//! writer.write_vars32(-300);
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert!(reader.read_bool().unwrap());
//! assert_eq!(reader.read_bits(7).unwrap(), 42);
//! assert_eq!(reader.read_vars32().unwrap(), -300);
//! ```

mod error;
mod reader;
mod varint;
mod writer;

pub use error::{BitError, BitResult};
pub use reader::BitReader;
pub use varint::{vars32_len, varu32_len, zigzag_decode, zigzag_encode};
pub use writer::BitWriter;
