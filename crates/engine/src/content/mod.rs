mod catalog;
mod compiler;

pub use catalog::{EntryPointDef, ExitDef, LevelCatalog, LevelDef, LevelRole};
pub use compiler::{
    compile_level_catalog, compile_level_catalog_from_str, ContentCompileError,
    ContentErrorCode, SourceLocation,
};
