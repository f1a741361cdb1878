//! Integration tests for incremental baking
//!
//! A fake compiler writes the object and a GCC-style `.d` file, so the
//! whole bake / record / skip cycle runs without a real toolchain.

use std::fs;
use std::path::{Path, PathBuf};

use cbake::bake::{Baker, CompileJob, Compiler};
use cbake::error::{CbError, Result};
use cbake::incremental::{self, CACHE_DIR_NAME, FLAGS_CACHE_FILE, IncrementalBuild};
use cbake::plugin::CompileOutput;
use cbake::project::{Context, keys};
use cbake::toolchain::Toolchain;
use tempfile::{TempDir, tempdir};

/// Writes `<object>` and `<object>.d` listing the source and `header`.
struct FakeGcc {
    header: PathBuf,
    invocations: Vec<(String, Vec<String>)>,
}

impl Compiler for FakeGcc {
    fn compile(&mut self, _toolchain: &Toolchain, job: &CompileJob<'_>) -> Result<CompileOutput> {
        self.invocations.push((
            job.source.to_string(),
            job.args.iter().map(|a| a.to_string()).collect(),
        ));
        fs::write(&job.object, b"obj").unwrap();
        let depfile = job.object.with_extension("d");
        fs::write(
            &depfile,
            format!(
                "{}: {} \\\n {}\n",
                job.object.display(),
                job.source,
                self.header.display()
            ),
        )
        .unwrap();
        Ok(CompileOutput {
            depfile: Some(depfile),
            ..CompileOutput::default()
        })
    }
}

/// Fails on sources ending with `broken`, compiles the rest.
struct BrokenOn<'a> {
    inner: FakeGcc,
    broken: &'a str,
}

impl Compiler for BrokenOn<'_> {
    fn compile(&mut self, toolchain: &Toolchain, job: &CompileJob<'_>) -> Result<CompileOutput> {
        if job.source.ends_with(self.broken) {
            return Err(CbError::CompileFailed {
                file: job.source.to_string(),
                status: "exit status: 1".into(),
            });
        }
        self.inner.compile(toolchain, job)
    }
}

struct Workspace {
    dir: TempDir,
    header: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/main.c"),
            "#include \"util.h\"\nint main(void) { return 0; }\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/util.c"),
            "#include \"util.h\"\nint util(void) { return 1; }\n",
        )
        .unwrap();
        let header = dir.path().join("src/util.h");
        fs::write(&header, "int util(void);\n").unwrap();
        Self { dir, header }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn toolchain(&self) -> Toolchain {
        Toolchain::gcc().with_directory_base(self.path().join(".build"))
    }

    fn context(&self, defines: &[&str]) -> Context {
        let mut ctx = Context::new();
        ctx.project("app");
        ctx.set(keys::BINARY_TYPE, keys::EXE).unwrap();
        ctx.add_file(self.path().join("src/main.c")).unwrap();
        ctx.add_file(self.path().join("src/util.c")).unwrap();
        for define in defines {
            ctx.add(keys::DEFINES, define).unwrap();
        }
        ctx
    }

    fn compiler(&self) -> FakeGcc {
        FakeGcc {
            header: self.header.clone(),
            invocations: Vec::new(),
        }
    }
}

#[test]
fn test_second_bake_skips_everything() {
    let ws = Workspace::new();
    let ctx = ws.context(&["NDEBUG"]);
    let mut baker = Baker::new(ws.toolchain()).with_plugin(IncrementalBuild::new());

    let mut compiler = ws.compiler();
    let first = baker.bake(&ctx, "app", &mut compiler).unwrap();
    assert_eq!(first.compiled.len(), 2);
    assert!(first.skipped.is_empty());

    // The plugin's dependency flag reaches the compiler.
    let (_, args) = &compiler.invocations[0];
    assert!(args.contains(&"-DNDEBUG".to_string()));
    assert!(args.contains(&"-MMD".to_string()));

    let cache = ws.path().join(".build").join(CACHE_DIR_NAME).join("app");
    assert!(cache.join(FLAGS_CACHE_FILE).is_file());

    let mut compiler = ws.compiler();
    let second = baker.bake(&ctx, "app", &mut compiler).unwrap();
    assert!(second.is_up_to_date());
    assert_eq!(second.skipped.len(), 2);
    assert!(compiler.invocations.is_empty());
    assert_eq!(first.objects, second.objects);
}

#[test]
fn test_header_change_rebuilds_dependents() {
    let ws = Workspace::new();
    let ctx = ws.context(&[]);
    let mut baker = Baker::new(ws.toolchain()).with_plugin(IncrementalBuild::new());
    baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();

    fs::write(&ws.header, "int util(void);\nint other(void);\n").unwrap();

    let mut compiler = ws.compiler();
    let report = baker.bake(&ctx, "app", &mut compiler).unwrap();
    assert_eq!(report.compiled.len(), 2);
    assert_eq!(compiler.invocations.len(), 2);
}

#[test]
fn test_source_change_rebuilds_only_that_file() {
    let ws = Workspace::new();
    let ctx = ws.context(&[]);
    let mut baker = Baker::new(ws.toolchain()).with_plugin(IncrementalBuild::new());
    baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();

    fs::write(
        ws.path().join("src/util.c"),
        "#include \"util.h\"\nint util(void) { return 42; }\n",
    )
    .unwrap();

    let report = baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();
    assert_eq!(report.compiled.len(), 1);
    assert!(report.compiled[0].ends_with("util.c"));
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].ends_with("main.c"));
}

#[test]
fn test_define_change_forces_full_rebuild() {
    let ws = Workspace::new();
    let mut baker = Baker::new(ws.toolchain()).with_plugin(IncrementalBuild::new());
    baker.bake(&ws.context(&["A"]), "app", &mut ws.compiler()).unwrap();

    let mut compiler = ws.compiler();
    let report = baker
        .bake(&ws.context(&["A", "B"]), "app", &mut compiler)
        .unwrap();
    assert_eq!(report.compiled.len(), 2);
    assert!(compiler.invocations[0].1.contains(&"-DB".to_string()));

    // The new fingerprint was stored, so the next bake is quiet again.
    let report = baker
        .bake(&ws.context(&["A", "B"]), "app", &mut ws.compiler())
        .unwrap();
    assert!(report.is_up_to_date());
}

#[test]
fn test_failed_bake_rebuilds_everything_next_time() {
    let ws = Workspace::new();
    let mut baker = Baker::new(ws.toolchain()).with_plugin(IncrementalBuild::new());
    let first = baker.bake(&ws.context(&[]), "app", &mut ws.compiler()).unwrap();
    assert_eq!(first.compiled.len(), 2);

    // New define: main.c is rebuilt with it, then util.c fails.
    let mut broken = BrokenOn {
        inner: ws.compiler(),
        broken: "util.c",
    };
    let err = baker
        .bake(&ws.context(&["EXTRA"]), "app", &mut broken)
        .unwrap_err();
    assert!(matches!(err, CbError::CompileFailed { .. }));
    assert_eq!(broken.inner.invocations.len(), 1);

    let cache = ws.path().join(".build").join(CACHE_DIR_NAME).join("app");
    assert!(!cache.join(FLAGS_CACHE_FILE).exists());

    let mut compiler = ws.compiler();
    let report = baker
        .bake(&ws.context(&["EXTRA"]), "app", &mut compiler)
        .unwrap();
    assert_eq!(report.compiled.len(), 2);
    assert!(
        compiler
            .invocations
            .iter()
            .all(|(_, args)| args.contains(&"-DEXTRA".to_string()))
    );
}

#[test]
fn test_missing_object_is_recompiled() {
    let ws = Workspace::new();
    let ctx = ws.context(&[]);
    let mut baker = Baker::new(ws.toolchain()).with_plugin(IncrementalBuild::new());
    let first = baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();

    fs::remove_file(&first.objects[0]).unwrap();

    let report = baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();
    assert_eq!(report.compiled, vec![first.compiled[0].clone()]);
}

#[test]
fn test_deleted_cache_forces_rebuild() {
    let ws = Workspace::new();
    let ctx = ws.context(&[]);
    let toolchain = ws.toolchain();
    let mut baker = Baker::new(toolchain.clone()).with_plugin(IncrementalBuild::new());
    baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();

    let removed = incremental::delete_cache(&toolchain, "app").unwrap();
    assert!(removed >= 3);

    let report = baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();
    assert_eq!(report.compiled.len(), 2);
}

#[test]
fn test_without_plugin_everything_compiles() {
    let ws = Workspace::new();
    let ctx = ws.context(&[]);
    let mut baker = Baker::new(ws.toolchain());
    baker.bake(&ctx, "app", &mut ws.compiler()).unwrap();

    let mut compiler = ws.compiler();
    let report = baker.bake(&ctx, "app", &mut compiler).unwrap();
    assert_eq!(report.compiled.len(), 2);
    assert!(!compiler.invocations[0].1.contains(&"-MMD".to_string()));
}
