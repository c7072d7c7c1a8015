//! Infrastructure - gzip + big-endian tag codec

mod codec;
mod mutf8;

pub use codec::GzipNbtCodec;
