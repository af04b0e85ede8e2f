//! Jack Compiler - single-pass Jack to VM code compiler.
//!
//! Each `.jack` file is one class. The parser reads it once, left to right,
//! and emits VM instructions while it goes; there is no syntax tree and no
//! optimisation pass. Files are independent, so a directory is compiled in
//! parallel.
//!
//! # Usage
//!
//! ```no_run
//! use jackc::{compile_file, compile_directory, write_result, CompileOptions};
//! use std::path::Path;
//!
//! let options = CompileOptions::default();
//!
//! // Compile a single file
//! let result = compile_file(Path::new("Main.jack"), options);
//! if result.is_ok() {
//!     write_result(&result, Path::new(".")).unwrap();
//! }
//!
//! // Compile every class of a program
//! let results = compile_directory(Path::new("Square/"), options);
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod error;
pub mod parser;
pub mod symbol_table;
pub mod token;
pub mod tokenizer;
pub mod vm_writer;

use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;

// Re-export key types
pub use diagnostic::{Diagnostic, format_error};
pub use emitter::Emitter;
pub use error::{CompileError, ErrorCategory};
pub use parser::Parser;
pub use symbol_table::{Symbol, SymbolKind, SymbolTable, VarType};
pub use vm_writer::VMWriter;

/// Result of compiling a single Jack file.
#[derive(Debug)]
pub struct CompileResult {
    /// File stem of the compiled unit; the output is `<filename>.vm`.
    pub filename: String,
    /// Source text, kept for diagnostics.
    pub source: String,
    /// The generated VM code (empty if compilation failed).
    pub vm_code: String,
    /// The fatal error, if any.
    pub error: Option<CompileError>,
    /// Instructions emitted before the error, when requested.
    pub partial: Vec<String>,
}

impl CompileResult {
    /// Check if the compilation was successful.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn failed(filename: &str, source: String, error: CompileError) -> Self {
        Self {
            filename: filename.to_string(),
            source,
            vm_code: String::new(),
            error: Some(error),
            partial: Vec::new(),
        }
    }
}

/// Compilation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Keep the instructions emitted before a fatal error (default: false).
    pub keep_partial: bool,
}

/// Compile Jack source code directly.
pub fn compile_source(source: &str, filename: &str, options: CompileOptions) -> CompileResult {
    let mut parser = Parser::new(source);
    match parser.compile_class() {
        Ok(()) => {
            let writer = parser.into_writer();
            if writer.is_empty() {
                log::info!("compiled {} (no subroutines)", filename);
            } else {
                log::info!("compiled {} ({} instructions)", filename, writer.len());
            }
            CompileResult {
                filename: filename.to_string(),
                source: source.to_string(),
                vm_code: writer.to_text(),
                error: None,
                partial: Vec::new(),
            }
        }
        Err(error) => {
            log::warn!("{} failed: {}", filename, error);
            let mut result = CompileResult::failed(filename, source.to_string(), error);
            if options.keep_partial {
                result.partial = parser.into_lines();
            }
            result
        }
    }
}

/// Compile a single Jack file. The unit is named after the file stem.
pub fn compile_file(path: &Path, options: CompileOptions) -> CompileResult {
    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    match fs::read_to_string(path) {
        Ok(source) => compile_source(&source, &filename, options),
        Err(e) => CompileResult::failed(&filename, String::new(), CompileError::io(path, e)),
    }
}

/// Compile all Jack files in a directory, sorted by filename.
pub fn compile_directory(dir: &Path, options: CompileOptions) -> Vec<CompileResult> {
    let mut jack_files: Vec<_> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "jack"))
            .collect(),
        Err(e) => {
            return vec![CompileResult::failed(
                &dir.to_string_lossy(),
                String::new(),
                CompileError::io(dir, e),
            )];
        }
    };

    if jack_files.is_empty() {
        return Vec::new();
    }
    jack_files.sort();

    // Parallel compilation; `collect` keeps the input order.
    jack_files
        .par_iter()
        .map(|path| compile_file(path, options))
        .collect()
}

/// Write a successful compile result to `<output_dir>/<filename>.vm`.
///
/// Failed results are refused, so a broken unit never leaves an output file.
pub fn write_result(result: &CompileResult, output_dir: &Path) -> Result<(), CompileError> {
    let vm_path = output_dir.join(format!("{}.vm", result.filename));
    if !result.is_ok() {
        return Err(CompileError::io(
            &vm_path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} did not compile", result.filename),
            ),
        ));
    }
    fs::write(&vm_path, &result.vm_code).map_err(|e| CompileError::io(&vm_path, e))?;
    log::info!("wrote {}", vm_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_source_simple() {
        let source = r#"
class Main {
    function void main() {
        return;
    }
}
"#;
        let result = compile_source(source, "Main", CompileOptions::default());
        assert!(result.is_ok());
        assert_eq!(result.vm_code, "function Main.main 0\npush constant 0\nreturn\n");
    }

    #[test]
    fn test_compile_source_with_error() {
        let source = r#"
class Main {
    function void main() {
        let x = 5;
        return;
    }
}
"#;
        let result = compile_source(source, "Main", CompileOptions::default());
        assert!(!result.is_ok());
        assert!(result.vm_code.is_empty());
        assert!(result.partial.is_empty());
        assert!(matches!(
            result.error,
            Some(CompileError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_class_without_subroutines_has_empty_output() {
        let result = compile_source(
            "class Point { field int x, y; static int count; }",
            "Point",
            CompileOptions::default(),
        );
        assert!(result.is_ok());
        assert_eq!(result.vm_code, "");
    }

    #[test]
    fn test_keep_partial() {
        let source = "class Main { function void main() { do Sys.halt(); let x = 5; } }";
        let result = compile_source(source, "Main", CompileOptions { keep_partial: true });
        assert!(!result.is_ok());
        assert_eq!(
            result.partial,
            [
                "function Main.main 0",
                "call Sys.halt 0",
                "pop temp 0",
                "push constant 5",
            ]
        );
    }

    #[test]
    fn test_default_options() {
        let options = CompileOptions::default();
        assert!(!options.keep_partial);
    }

    #[test]
    fn test_write_result_refuses_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = compile_source("class Main {", "Main", CompileOptions::default());
        assert!(write_result(&result, dir.path()).is_err());
        assert!(!dir.path().join("Main.vm").exists());
    }
}
