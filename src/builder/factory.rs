//! Compiler factory.
//!
//! Wraps a base compiler either as a plain single-shot compiler or with the
//! incremental/parallel behavior used by preprocessor-based languages.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use rayon::prelude::*;

use crate::builder::compiler::{Compiler, WorkResult};
use crate::builder::spec::CompileSpec;

/// Preprocessor flavor the incremental analysis should assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CPreprocessorDialect {
    /// Strict standard C preprocessing (Visual C++)
    StandardC,
    /// GCC extensions such as `#include_next`
    Gcc,
}

/// Shared handle to a compile-role compiler.
pub type SharedCompiler = Arc<dyn Compiler<CompileSpec>>;

/// Capability that adds incremental and parallel behavior to a compiler.
pub trait IncrementalCompilation: Send + Sync {
    fn decorate(
        &self,
        base: SharedCompiler,
        dialect: CPreprocessorDialect,
        output_suffix: &str,
    ) -> SharedCompiler;
}

/// Default capability: compile each source of a spec as an independent unit
/// on the rayon pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelSourceCompilation;

impl IncrementalCompilation for ParallelSourceCompilation {
    fn decorate(
        &self,
        base: SharedCompiler,
        dialect: CPreprocessorDialect,
        output_suffix: &str,
    ) -> SharedCompiler {
        Arc::new(ParallelCompiler {
            base,
            dialect,
            output_suffix: output_suffix.to_string(),
        })
    }
}

struct ParallelCompiler {
    base: SharedCompiler,
    dialect: CPreprocessorDialect,
    output_suffix: String,
}

impl Compiler<CompileSpec> for ParallelCompiler {
    fn execute(&self, spec: CompileSpec) -> Result<WorkResult> {
        if spec.source_files.len() <= 1 {
            return self.base.execute(spec);
        }

        tracing::info!(
            "Compiling {} source files ({:?} preprocessor, {} outputs)",
            spec.source_files.len(),
            self.dialect,
            self.output_suffix
        );

        let results = spec
            .source_files
            .par_iter()
            .map(|source| self.base.execute(spec.for_source(source)))
            .collect::<Result<Vec<_>>>()?;

        let mut merged = WorkResult::default();
        for result in results {
            merged.merge(result);
        }
        Ok(merged)
    }
}

/// Creates the compilers handed out by platform tool providers.
#[derive(Clone)]
pub struct NativeCompilerFactory {
    incremental: Arc<dyn IncrementalCompilation>,
}

impl fmt::Debug for NativeCompilerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeCompilerFactory")
    }
}

impl Default for NativeCompilerFactory {
    fn default() -> Self {
        NativeCompilerFactory::new(Arc::new(ParallelSourceCompilation))
    }
}

impl NativeCompilerFactory {
    pub fn new(incremental: Arc<dyn IncrementalCompilation>) -> Self {
        NativeCompilerFactory { incremental }
    }

    /// Plain compiler: one invocation per spec, no incremental behavior.
    pub fn compiler<S, C>(&self, base: C) -> Arc<dyn Compiler<S>>
    where
        C: Compiler<S> + 'static,
    {
        Arc::new(base)
    }

    /// Compiler for preprocessor-based languages whose sources compile
    /// independently.
    pub fn incremental_and_parallel_compiler<C>(
        &self,
        base: C,
        dialect: CPreprocessorDialect,
        output_suffix: &str,
    ) -> SharedCompiler
    where
        C: Compiler<CompileSpec> + 'static,
    {
        self.incremental
            .decorate(Arc::new(base), dialect, output_suffix)
    }
}
