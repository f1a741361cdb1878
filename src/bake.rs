//! Bake driver: compiles the `files` of one project.
//!
//! Flag arguments shared by every file of a bake are rendered once into an
//! [`Arena`] that is reset at the start of the next bake. Plugins decide
//! which files get compiled and see the result of each compilation.
//! Linking is not performed here.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::{CbError, Result};
use crate::hash::djb2;
use crate::memory::{Arena, ArenaRef};
use crate::plugin::{BuildPlugin, CompileOutput};
use crate::project::{Context, Project, keys};
use crate::toolchain::{Toolchain, ToolchainFamily};

/// One compiler invocation.
#[derive(Debug, Clone)]
pub struct CompileJob<'a> {
    pub source: &'a str,
    pub object: PathBuf,
    pub args: Vec<&'a str>,
    pub working_directory: Option<&'a Path>,
}

/// Seam between the bake driver and the process that compiles.
pub trait Compiler {
    fn compile(&mut self, toolchain: &Toolchain, job: &CompileJob<'_>) -> Result<CompileOutput>;
}

/// Runs the toolchain's compiler as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCompiler;

impl ProcessCompiler {
    pub fn command(toolchain: &Toolchain, job: &CompileJob<'_>) -> Command {
        let mut cmd = Command::new(&toolchain.compiler);
        match toolchain.family {
            ToolchainFamily::Msvc => {
                cmd.arg("/nologo")
                    .arg("/c")
                    .arg(job.source)
                    .arg(format!("/Fo{}", job.object.display()));
            }
            ToolchainFamily::Gcc => {
                cmd.arg("-c").arg(job.source).arg("-o").arg(&job.object);
            }
        }
        cmd.args(&job.args);
        if let Some(dir) = job.working_directory {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Compiler for ProcessCompiler {
    fn compile(&mut self, toolchain: &Toolchain, job: &CompileJob<'_>) -> Result<CompileOutput> {
        let mut cmd = Self::command(toolchain, job);
        debug!("running {:?}", cmd);

        let output = cmd.output().map_err(|e| CbError::Spawn {
            program: toolchain.compiler.clone(),
            source: e,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            // cl reports errors on stdout.
            let details = if stderr.trim().is_empty() { &stdout } else { &stderr };
            return Err(CbError::CompileFailed {
                file: job.source.to_string(),
                status: format!("{}: {}", output.status, details.trim()),
            });
        }
        if !stderr.trim().is_empty() {
            warn!("{}: {}", job.source, stderr.trim());
        }

        let depfile = match toolchain.family {
            ToolchainFamily::Gcc => Some(job.object.with_extension("d")),
            ToolchainFamily::Msvc => None,
        };
        Ok(CompileOutput {
            stdout,
            stderr,
            depfile,
        })
    }
}

/// Outcome of one bake.
#[derive(Debug, Clone, Default)]
pub struct BakeReport {
    pub project: String,
    pub compiled: Vec<String>,
    pub skipped: Vec<String>,
    pub objects: Vec<PathBuf>,
    pub artifact: PathBuf,
}

impl BakeReport {
    pub fn is_up_to_date(&self) -> bool {
        self.compiled.is_empty()
    }
}

pub struct Baker {
    toolchain: Toolchain,
    plugins: Vec<Box<dyn BuildPlugin>>,
    arena: Arena,
    progress: bool,
}

fn is_cxx(file: &str) -> bool {
    let ext = Path::new(file)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    matches!(ext.as_str(), "cpp" | "cc" | "cxx")
}

impl Baker {
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            plugins: Vec::new(),
            arena: Arena::new(),
            progress: false,
        }
    }

    pub fn with_plugin(mut self, plugin: impl BuildPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Shows a progress bar on stderr while compiling.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn BuildPlugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    /// Object path for `source`; the path hash keeps same-named files in
    /// different directories apart.
    pub fn object_path(&self, output_dir: &Path, source: &str) -> PathBuf {
        let stem = Path::new(source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        output_dir.join(format!(
            "{stem}-{:08x}.{}",
            djb2(source.as_bytes()),
            self.toolchain.object_extension()
        ))
    }

    fn flag_arguments(
        &mut self,
        project: &Project,
    ) -> (Vec<ArenaRef>, Vec<ArenaRef>, Vec<ArenaRef>) {
        let (define, include) = match self.toolchain.family {
            ToolchainFamily::Msvc => ("/D", "/I"),
            ToolchainFamily::Gcc => ("-D", "-I"),
        };

        let mut common = Vec::new();
        for value in project.values(keys::DEFINES).values() {
            common.push(self.arena.format(format_args!("{define}{value}")));
        }
        for value in project.values(keys::INCLUDE_DIR).values() {
            common.push(self.arena.format(format_args!("{include}{value}")));
        }
        for value in project.values(keys::CXFLAGS).values() {
            common.push(self.arena.alloc_str(value));
        }
        for plugin in &self.plugins {
            if let Some(arg) = plugin.extra_argument(&self.toolchain)
                && !common.iter().any(|r| self.arena.str(*r) == arg)
            {
                common.push(self.arena.alloc_str(arg));
            }
        }

        let c_only = project
            .values(keys::CFLAGS)
            .values()
            .map(|v| self.arena.alloc_str(v))
            .collect();
        let cxx_only = project
            .values(keys::CXXFLAGS)
            .values()
            .map(|v| self.arena.alloc_str(v))
            .collect();
        (common, c_only, cxx_only)
    }

    fn finish(&mut self, success: bool) {
        for plugin in &mut self.plugins {
            plugin.bake_finished(success);
        }
    }

    /// Compiles every file of project `name` that the plugins let through.
    ///
    /// Files without an object are always compiled. Plugins hear about the
    /// end of the bake, failed or not.
    pub fn bake(
        &mut self,
        ctx: &Context,
        name: &str,
        compiler: &mut dyn Compiler,
    ) -> Result<BakeReport> {
        let project = ctx.project_by_name(name)?;
        self.arena.reset();

        for plugin in &mut self.plugins {
            plugin.bake_starting(&self.toolchain, project);
        }

        let output_dir = self.toolchain.output_dir(project);
        let output_dir = match std::path::absolute(&output_dir)
            .and_then(|dir| fs::create_dir_all(&dir).map(|()| dir))
        {
            Ok(dir) => dir,
            Err(e) => {
                self.finish(false);
                return Err(CbError::io(&output_dir, e));
            }
        };

        let working_directory = project.property(keys::WORKING_DIRECTORY).map(Path::new);
        let (common, c_only, cxx_only) = self.flag_arguments(project);

        let files: Vec<&str> = project.values(keys::FILES).values().collect();
        let pb = if self.progress {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut report = BakeReport {
            project: project.name().to_string(),
            artifact: output_dir.join(self.toolchain.artifact_name(project)),
            ..BakeReport::default()
        };

        for file in files {
            let object = self.object_path(&output_dir, file);

            let needed = if object.is_file() {
                // Every plugin is asked, so each keeps its own bookkeeping.
                let mut wanted = true;
                for plugin in &mut self.plugins {
                    wanted &= plugin.can_process_file(file);
                }
                wanted
            } else {
                for plugin in &mut self.plugins {
                    plugin.file_forced(file);
                }
                true
            };

            if needed {
                pb.set_message(format!("Compiling {file}"));
                let extra = if is_cxx(file) { &cxx_only } else { &c_only };
                let job = CompileJob {
                    source: file,
                    object: object.clone(),
                    args: common
                        .iter()
                        .chain(extra.iter())
                        .map(|r| self.arena.str(*r))
                        .collect(),
                    working_directory,
                };
                let output = match compiler.compile(&self.toolchain, &job) {
                    Ok(output) => output,
                    Err(e) => {
                        pb.finish_and_clear();
                        self.finish(false);
                        return Err(e);
                    }
                };
                for plugin in &mut self.plugins {
                    plugin.file_processed(file, &output);
                }
                report.compiled.push(file.to_string());
            } else {
                debug!("up to date: {file}");
                report.skipped.push(file.to_string());
            }

            report.objects.push(object);
            pb.inc(1);
        }

        pb.finish_and_clear();
        self.finish(true);
        info!(
            "baked '{}': {} compiled, {} skipped",
            report.project,
            report.compiled.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;

    /// Writes the object and records the jobs it saw.
    #[derive(Default)]
    struct RecordingCompiler {
        jobs: Vec<(String, Vec<String>)>,
    }

    impl Compiler for RecordingCompiler {
        fn compile(
            &mut self,
            _toolchain: &Toolchain,
            job: &CompileJob<'_>,
        ) -> Result<CompileOutput> {
            fs::write(&job.object, b"obj").map_err(|e| CbError::io(&job.object, e))?;
            self.jobs.push((
                job.source.to_string(),
                job.args.iter().map(|a| a.to_string()).collect(),
            ));
            Ok(CompileOutput::default())
        }
    }

    struct FailingCompiler;

    impl Compiler for FailingCompiler {
        fn compile(
            &mut self,
            _toolchain: &Toolchain,
            job: &CompileJob<'_>,
        ) -> Result<CompileOutput> {
            Err(CbError::CompileFailed {
                file: job.source.to_string(),
                status: "exit status: 1".into(),
            })
        }
    }

    struct Veto;

    impl BuildPlugin for Veto {
        fn name(&self) -> &str {
            "veto"
        }

        fn can_process_file(&mut self, file: &str) -> bool {
            !file.ends_with("skip.c")
        }
    }

    fn context(dir: &Path) -> Context {
        let mut ctx = Context::new();
        ctx.project("app");
        ctx.set(keys::OUTPUT_DIR, &dir.join("out").to_string_lossy()).unwrap();
        ctx.add(keys::DEFINES, "DEBUG").unwrap();
        ctx.add(keys::INCLUDE_DIR, "include").unwrap();
        ctx.add(keys::CXFLAGS, "-O2").unwrap();
        ctx.add(keys::CXXFLAGS, "-std=c++17").unwrap();
        ctx.add(keys::FILES, "/src/main.c").unwrap();
        ctx.add(keys::FILES, "/src/util.cpp").unwrap();
        ctx
    }

    #[test]
    fn test_gcc_arguments() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let mut compiler = RecordingCompiler::default();
        let mut baker = Baker::new(Toolchain::gcc());

        let report = baker.bake(&ctx, "app", &mut compiler).unwrap();
        assert_eq!(report.compiled.len(), 2);
        assert_eq!(report.objects.len(), 2);

        let (source, args) = &compiler.jobs[0];
        assert_eq!(source, "/src/main.c");
        assert_eq!(args, &["-DDEBUG", "-Iinclude", "-O2"]);
        let (_, cxx_args) = &compiler.jobs[1];
        assert_eq!(cxx_args.last().map(String::as_str), Some("-std=c++17"));
    }

    #[test]
    fn test_msvc_arguments() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let mut compiler = RecordingCompiler::default();
        let mut baker = Baker::new(Toolchain::msvc());

        baker.bake(&ctx, "app", &mut compiler).unwrap();
        assert_eq!(compiler.jobs[0].1, vec!["/DDEBUG", "/Iinclude", "-O2"]);
    }

    #[test]
    fn test_plugin_can_skip_files_with_objects() {
        let dir = tempdir().unwrap();
        let mut ctx = context(dir.path());
        ctx.add(keys::FILES, "/src/skip.c").unwrap();

        let mut baker = Baker::new(Toolchain::gcc()).with_plugin(Veto);
        let mut compiler = RecordingCompiler::default();

        // No object yet: compiled anyway.
        let first = baker.bake(&ctx, "app", &mut compiler).unwrap();
        assert_eq!(first.compiled.len(), 3);

        let second = baker.bake(&ctx, "app", &mut compiler).unwrap();
        assert_eq!(second.skipped, vec!["/src/skip.c"]);
        assert_eq!(second.compiled.len(), 2);
    }

    /// Logs every hook call into a shared list.
    struct Events(Rc<RefCell<Vec<String>>>);

    impl BuildPlugin for Events {
        fn name(&self) -> &str {
            "events"
        }

        fn can_process_file(&mut self, file: &str) -> bool {
            self.0.borrow_mut().push(format!("ask {file}"));
            false
        }

        fn file_forced(&mut self, file: &str) {
            self.0.borrow_mut().push(format!("forced {file}"));
        }

        fn bake_finished(&mut self, success: bool) {
            self.0.borrow_mut().push(format!("finished {success}"));
        }
    }

    #[test]
    fn test_missing_object_is_forced_not_asked() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut baker = Baker::new(Toolchain::gcc()).with_plugin(Events(events.clone()));
        let mut compiler = RecordingCompiler::default();

        baker.bake(&ctx, "app", &mut compiler).unwrap();
        assert_eq!(
            *events.borrow(),
            vec!["forced /src/main.c", "forced /src/util.cpp", "finished true"]
        );

        events.borrow_mut().clear();
        let report = baker.bake(&ctx, "app", &mut compiler).unwrap();
        assert!(report.is_up_to_date());
        assert_eq!(
            *events.borrow(),
            vec!["ask /src/main.c", "ask /src/util.cpp", "finished true"]
        );
    }

    #[test]
    fn test_failed_bake_is_reported_to_plugins() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut baker = Baker::new(Toolchain::gcc()).with_plugin(Events(events.clone()));

        assert!(baker.bake(&ctx, "app", &mut FailingCompiler).is_err());
        assert_eq!(events.borrow().last().map(String::as_str), Some("finished false"));
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_compile_failure_stops_bake() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let mut baker = Baker::new(Toolchain::gcc());
        let err = baker.bake(&ctx, "app", &mut FailingCompiler).unwrap_err();
        assert!(matches!(err, CbError::CompileFailed { .. }));
    }

    #[test]
    fn test_unknown_project() {
        let ctx = Context::new();
        let mut baker = Baker::new(Toolchain::gcc());
        let err = baker
            .bake(&ctx, "ghost", &mut RecordingCompiler::default())
            .unwrap_err();
        assert!(matches!(err, CbError::UnknownProject(_)));
    }

    #[test]
    fn test_object_paths_differ_per_directory() {
        let baker = Baker::new(Toolchain::gcc());
        let out = Path::new("out");
        let a = baker.object_path(out, "/a/main.c");
        let b = baker.object_path(out, "/b/main.c");
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "o");
    }

    #[test]
    fn test_extra_argument_added_once() {
        struct Deps;
        impl BuildPlugin for Deps {
            fn name(&self) -> &str {
                "deps"
            }
            fn extra_argument(&self, toolchain: &Toolchain) -> Option<&'static str> {
                Some(toolchain.extra_argument())
            }
        }

        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let mut baker = Baker::new(Toolchain::gcc()).with_plugin(Deps).with_plugin(Deps);
        let mut compiler = RecordingCompiler::default();
        baker.bake(&ctx, "app", &mut compiler).unwrap();
        let count = compiler.jobs[0].1.iter().filter(|a| *a == "-MMD").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_process_command_line() {
        let toolchain = Toolchain::gcc();
        let job = CompileJob {
            source: "main.c",
            object: PathBuf::from("out/main.o"),
            args: vec!["-MMD"],
            working_directory: None,
        };
        let cmd = ProcessCompiler::command(&toolchain, &job);
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "gcc");
        assert_eq!(args, vec!["-c", "main.c", "-o", "out/main.o", "-MMD"]);
    }
}
