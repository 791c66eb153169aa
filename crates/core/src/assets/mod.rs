//! Build-time conversion and the on-disk asset format.

pub mod chunk;
pub mod codec;
pub mod convert;

pub use chunk::{ChunkReader, CorruptAsset, Record};
pub use codec::{
    install, load, load_assets, load_file, save, save_to_file, write_assets, AssetError,
    LoadReport, LoadedAssets,
};
pub use convert::{convert, Conversion, ConversionReport, ConvertError, RgbaImage};
