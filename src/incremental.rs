//! Incremental build cache.
//!
//! Decides per source file whether its previous object is still valid and
//! records fresh dependency fingerprints after each successful compile.
//!
//! Layout under the toolchain's directory base:
//!
//! ```text
//! <base>/cbp_ib_cache/<project>/
//!     flags.cache                          <len>;<hash>
//!     <volume>-<file>-<filename>.cache     one record per line
//! ```
//!
//! A record line is `path;size;mtime;hash\r\n`. The first record of a file
//! cache is the compiled file itself, the rest are the headers it pulled
//! in. Every problem met while reading or writing the cache (missing file,
//! bad line, I/O error) ends in "needs compile", never in an error.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::buffer::DynString;
use crate::deps::{self, MsvcDepParser};
use crate::fileinfo::FileInfo;
use crate::hash::Fnv1a64;
use crate::memory::tmp;
use crate::plugin::{BuildPlugin, CompileOutput};
use crate::project::{Project, keys};
use crate::toolchain::{Toolchain, ToolchainFamily};

pub const CACHE_DIR_NAME: &str = "cbp_ib_cache";
pub const FLAGS_CACHE_FILE: &str = "flags.cache";

/// Properties whose change invalidates every object of a project.
pub const FLAG_KEYS: [&str; 5] = [
    keys::DEFINES,
    keys::CXFLAGS,
    keys::CFLAGS,
    keys::CXXFLAGS,
    keys::INCLUDE_DIR,
];

/// Counters of the current bake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncrementalStats {
    pub ignored: usize,
    pub compilable: usize,
}

/// `<base>/cbp_ib_cache/<project>/`
pub fn cache_dir(toolchain: &Toolchain, project_name: &str) -> PathBuf {
    toolchain
        .default_directory_base
        .join(CACHE_DIR_NAME)
        .join(project_name)
}

/// Total length and combined FNV-1a hash of every flag-affecting value.
///
/// Each value is hashed with its key and a NUL terminator, so splitting,
/// merging or moving values between keys changes the hash.
pub fn flags_fingerprint(project: &Project) -> (u64, u64) {
    let mut len = 0u64;
    let mut hash = Fnv1a64::new();
    for key in FLAG_KEYS {
        for value in project.values(key).values() {
            hash = hash
                .combine(key.as_bytes())
                .combine(&[0])
                .combine(value.as_bytes())
                .combine(&[0]);
            len += value.len() as u64;
        }
    }
    (len, hash.finish())
}

/// Removes every file under the project's cache directory.
pub fn delete_cache(toolchain: &Toolchain, project_name: &str) -> std::io::Result<usize> {
    let dir = cache_dir(toolchain, project_name);
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in WalkDir::new(&dir).into_iter() {
        let entry = entry.map_err(std::io::Error::other)?;
        if entry.file_type().is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Splits `path;size;mtime;hash` into its path and fingerprint.
pub fn parse_record(line: &str) -> Option<(&str, FileInfo)> {
    let (path, numbers) = line.split_once(';')?;
    let mut fields = numbers
        .trim_end_matches(['\r', '\n'])
        .split(';')
        .map(|f| f.trim().parse::<u64>());

    let size = fields.next()?.ok()?;
    let last_modification = fields.next()?.ok()?;
    let hash = fields.next()?.ok()?;
    if fields.next().is_some() {
        return None;
    }

    Some((
        path,
        FileInfo {
            size,
            last_modification,
            hash,
            ..FileInfo::default()
        },
    ))
}

/// The incremental cache, driven as a [`BuildPlugin`].
#[derive(Debug, Default)]
pub struct IncrementalBuild {
    cache_dir: PathBuf,
    family: Option<ToolchainFamily>,
    working_directory: Option<PathBuf>,
    needs_full_rebuild: bool,
    stats: IncrementalStats,
}

impl IncrementalBuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> IncrementalStats {
        self.stats
    }

    /// Whether flags changed since the last bake of this project.
    pub fn needs_full_rebuild(&self) -> bool {
        self.needs_full_rebuild
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Compares the project's flags fingerprint with `flags.cache`, then
    /// stores the new one whatever the outcome. A failed bake removes it
    /// again in [`bake_finished`](BuildPlugin::bake_finished).
    fn check_full_rebuild_needed(&self, project: &Project) -> bool {
        let path = self.cache_dir.join(FLAGS_CACHE_FILE);
        let (len, hash) = flags_fingerprint(project);

        let cached = fs::read_to_string(&path).ok().and_then(|content| {
            let (l, h) = content.trim().split_once(';')?;
            Some((l.parse::<u64>().ok()?, h.parse::<u64>().ok()?))
        });
        let unchanged = cached == Some((len, hash));

        let written = tmp::scope(|t| {
            let r = t.format(format_args!("{len};{hash}"));
            fs::write(&path, t.get(r))
        });
        if let Err(e) = written {
            error!("could not write {}: {e}", path.display());
            // Leave no stale fingerprint behind.
            let _ = fs::remove_file(&path);
        }

        if !unchanged {
            debug!("incremental build: flags changed, full rebuild");
        }
        !unchanged
    }

    /// Cache record file for `file`, named from its identity.
    pub fn record_path(&self, file: &Path) -> std::io::Result<PathBuf> {
        let identity = FileInfo::identity(file)?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        Ok(tmp::scope(|t| {
            let r = t.format(format_args!(
                "{}-{}-{}.cache",
                identity.volume_id, identity.file_id, filename
            ));
            self.cache_dir.join(t.str(r))
        }))
    }

    fn resolve(&self, dependency: &str) -> PathBuf {
        let path = Path::new(dependency);
        match &self.working_directory {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Whether every record in `record_path` still matches the disk and
    /// the first one is `file` itself.
    fn records_match(&self, file: &str, record_path: &Path) -> bool {
        let handle = match File::open(record_path) {
            Ok(f) => f,
            Err(e) => {
                debug!("could not open {}: {e}", record_path.display());
                return false;
            }
        };
        let mut reader = BufReader::new(handle);
        let mut line = String::new();
        let mut records = 0usize;

        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    info!("could not read {}: {e}", record_path.display());
                    return false;
                }
            }
            let Some((path, recorded)) = parse_record(&line) else {
                info!("could not deserialize {}", record_path.display());
                return false;
            };
            if records == 0 && path != file {
                debug!(
                    "incremental build: {} records {path}, not {file}",
                    record_path.display()
                );
                return false;
            }
            match FileInfo::query(Path::new(path)) {
                Ok(current) if current.matches(&recorded) => records += 1,
                Ok(_) => {
                    debug!("incremental build: changed: {path}");
                    return false;
                }
                Err(e) => {
                    debug!("incremental build: cannot query {path}: {e}");
                    return false;
                }
            }
        }

        // An empty record never vouches for anything.
        records > 0
    }

    /// Decides whether `file` must be compiled and updates the stats.
    pub fn needs_compile(&mut self, file: &str) -> bool {
        let needed = self.needs_full_rebuild
            || match self.record_path(Path::new(file)) {
                Ok(record) => !self.records_match(file, &record),
                Err(e) => {
                    debug!("incremental build: no identity for {file}: {e}");
                    true
                }
            };

        if needed {
            debug!("incremental build: not skip: {file}");
            self.stats.compilable += 1;
        } else {
            debug!("incremental build: skip: {file}");
            self.stats.ignored += 1;
        }
        needed
    }

    /// Rewrites the record of `file` with its own fingerprint followed by
    /// one line per dependency.
    pub fn record<I, S>(&self, file: &str, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let file_path = Path::new(file);
        let record_path = match self.record_path(file_path) {
            Ok(p) => p,
            Err(e) => {
                error!("could not get file info of {file}: {e}");
                return;
            }
        };

        let mut content = DynString::new();
        match FileInfo::query(file_path) {
            Ok(info) => append_record(&mut content, file, &info),
            Err(e) => {
                error!("could not get file info of {file}: {e}");
                let _ = fs::remove_file(&record_path);
                return;
            }
        }

        for dependency in dependencies {
            let path = self.resolve(dependency.as_ref());
            match FileInfo::query(&path) {
                Ok(info) => append_record(&mut content, &path.to_string_lossy(), &info),
                Err(e) => error!("could not get file info of {}: {e}", path.display()),
            }
        }

        if let Err(e) = fs::write(&record_path, content.as_bytes()) {
            error!("could not write {}: {e}", record_path.display());
            let _ = fs::remove_file(&record_path);
        }
    }
}

fn append_record(out: &mut DynString, path: &str, info: &FileInfo) {
    out.append_fmt(format_args!(
        "{};{};{};{}\r\n",
        path, info.size, info.last_modification, info.hash
    ));
}

impl BuildPlugin for IncrementalBuild {
    fn name(&self) -> &str {
        "incremental_build"
    }

    fn bake_starting(&mut self, toolchain: &Toolchain, project: &Project) {
        self.stats = IncrementalStats::default();
        self.family = Some(toolchain.family);
        self.cache_dir = cache_dir(toolchain, project.name());
        self.working_directory = project
            .property(keys::WORKING_DIRECTORY)
            .map(PathBuf::from);

        if let Err(e) = fs::create_dir_all(&self.cache_dir) {
            error!("could not create {}: {e}", self.cache_dir.display());
        }
        self.needs_full_rebuild = self.check_full_rebuild_needed(project);
    }

    fn extra_argument(&self, toolchain: &Toolchain) -> Option<&'static str> {
        Some(toolchain.extra_argument())
    }

    fn can_process_file(&mut self, file: &str) -> bool {
        self.needs_compile(file)
    }

    fn file_forced(&mut self, file: &str) {
        debug!("incremental build: no object: {file}");
        self.stats.compilable += 1;
    }

    fn file_processed(&mut self, file: &str, output: &CompileOutput) {
        match self.family {
            Some(ToolchainFamily::Msvc) => {
                self.record(file, MsvcDepParser::new(&output.stdout));
            }
            Some(ToolchainFamily::Gcc) => {
                let dependencies = match &output.depfile {
                    Some(depfile) => deps::read_gcc_depfile(depfile).unwrap_or_else(|e| {
                        warn!("could not read {}: {e}", depfile.display());
                        Vec::new()
                    }),
                    None => Vec::new(),
                };
                self.record(file, dependencies);
            }
            None => warn!("file_processed called before bake_starting"),
        }
    }

    fn bake_finished(&mut self, success: bool) {
        if success {
            return;
        }
        let path = self.cache_dir.join(FLAGS_CACHE_FILE);
        match fs::remove_file(&path) {
            Ok(()) => debug!("incremental build: bake failed, removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => error!("could not remove {}: {e}", path.display()),
        }
    }
}
