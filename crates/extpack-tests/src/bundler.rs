//! In-process bundler double.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use extpack_cli::bundler::{
    BuildLog, BuildRequest, BuildResult, Bundler, BundlerError, Loader, OutputKind, OutputRecord,
};
use extpack_cli::reconcile::output_family;

/// Content hash appended to bundled static files.
pub const FILE_HASH: &str = "a1b2c3d4";

/// A bundler that behaves like a well-mannered real one.
///
/// Every unique entrypoint yields one record, in submission order, at its
/// root-relative location inside `outdir`:
///
/// - scripts become `.js`, styles `.css`
/// - HTML pages are copied unchanged
/// - anything else is copied with [`FILE_HASH`] appended to its stem
///
/// Files are actually written so the pipeline can patch and rename them.
///
/// [`ScriptedBundler::bun_shaped`] switches to the output shape Bun reports
/// instead.
#[derive(Debug, Default)]
pub struct ScriptedBundler {
    requests: Mutex<Vec<BuildRequest>>,
    fail: bool,
    chunks: bool,
    bun_shaped: bool,
}

impl ScriptedBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bundler that reports failure with one error log and no outputs.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Emits a shared chunk before every entrypoint record.
    pub fn with_chunks() -> Self {
        Self {
            chunks: true,
            ..Self::default()
        }
    }

    /// Reports outputs the way Bun does:
    ///
    /// - one record per submission; a repeat gets its own `-2`, `-3` name
    /// - other files become a `.js` file-loader wrapper re-exporting the
    ///   hashed copy, and the copies are reported as assets after every
    ///   entry point
    /// - HTML pages are followed by the script Bun derives from them
    pub fn bun_shaped() -> Self {
        Self {
            bun_shaped: true,
            ..Self::default()
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<BuildRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn invocations(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Bundler for ScriptedBundler {
    fn build(&self, request: &BuildRequest) -> Result<BuildResult, BundlerError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Ok(BuildResult::failure(vec![BuildLog::new(
                "error",
                "Could not resolve \"./missing\"",
            )]));
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut outputs = Vec::new();
        let mut assets = Vec::new();
        for (index, entry) in request.entrypoints.iter().enumerate() {
            let occurrence = seen.entry(entry.as_str()).or_default();
            *occurrence += 1;
            let occurrence = *occurrence;
            if occurrence > 1 && !self.bun_shaped {
                continue;
            }
            if self.chunks {
                let chunk = request.outdir.join(format!("chunk-{:08}.js", index));
                write(&chunk, b"// shared")?;
                outputs.push(OutputRecord::chunk(chunk));
            }
            if self.bun_shaped {
                emit_bun(request, entry, occurrence, &mut outputs, &mut assets)?;
            } else {
                outputs.push(emit(request, entry)?);
            }
        }
        outputs.extend(assets);
        Ok(BuildResult::success(outputs))
    }
}

/// Where an entrypoint lands inside `outdir`.
struct Placement<'a> {
    source: &'a Path,
    relative: &'a Path,
    stem: String,
    dir: PathBuf,
}

impl<'a> Placement<'a> {
    fn of(request: &BuildRequest, entry: &'a str) -> Self {
        let source = Path::new(entry);
        let relative = source.strip_prefix(&request.root).unwrap_or(source);
        let relative = relative.strip_prefix("/").unwrap_or(relative);
        let stem = relative
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = request
            .outdir
            .join(relative.parent().unwrap_or_else(|| Path::new("")));
        Self {
            source,
            relative,
            stem,
            dir,
        }
    }
}

fn emit_bun(
    request: &BuildRequest,
    entry: &str,
    occurrence: usize,
    outputs: &mut Vec<OutputRecord>,
    assets: &mut Vec<OutputRecord>,
) -> Result<(), BundlerError> {
    let place = Placement::of(request, entry);
    let name = match occurrence {
        1 => place.stem.clone(),
        n => format!("{}-{}", place.stem, n),
    };

    match output_family(entry).as_str() {
        "js" => {
            let path = place.dir.join(format!("{}.js", name));
            write(&path, format!("// bundled {}", place.relative.display()).as_bytes())?;
            outputs.push(OutputRecord::script(path));
        }
        "css" => {
            let path = place.dir.join(format!("{}.css", name));
            write(&path, b"/* bundled */")?;
            outputs.push(OutputRecord::style(path));
        }
        "html" => {
            let page = place.dir.join(format!("{}.html", name));
            write(&page, &read(place.source)?)?;
            outputs.push(OutputRecord::html(page));
            let derived = place.dir.join(format!("{}-{}.js", name, FILE_HASH));
            write(&derived, b"// page script")?;
            outputs.push(OutputRecord::new(derived, OutputKind::EntryPoint, Loader::Html));
        }
        ext => {
            let copied = format!("{}-{}.{}", place.stem, FILE_HASH, ext);
            let ident: String = place
                .stem
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            let wrapper = place.dir.join(format!("{}.js", name));
            let source = format!(
                "var _{0}_default = \"./{1}\";\nexport {{\n  _{0}_default as default\n}};\n",
                ident, copied
            );
            write(&wrapper, source.as_bytes())?;
            outputs.push(OutputRecord::file_wrapper(wrapper));

            let asset = place.dir.join(copied);
            write(&asset, &read(place.source)?)?;
            assets.push(OutputRecord::file_asset(asset));
        }
    }
    Ok(())
}

fn emit(request: &BuildRequest, entry: &str) -> Result<OutputRecord, BundlerError> {
    let Placement {
        source,
        relative,
        stem,
        dir,
    } = Placement::of(request, entry);

    let family = output_family(entry);
    let record = match family.as_str() {
        "js" => {
            let path = dir.join(format!("{}.js", stem));
            write(&path, format!("// bundled {}", relative.display()).as_bytes())?;
            OutputRecord::script(path)
        }
        "css" => {
            let path = dir.join(format!("{}.css", stem));
            write(&path, b"/* bundled */")?;
            OutputRecord::style(path)
        }
        "html" => {
            let path = dir.join(format!("{}.html", stem));
            write(&path, &read(source)?)?;
            OutputRecord::html(path)
        }
        ext => {
            let path = dir.join(format!("{}-{}.{}", stem, FILE_HASH, ext));
            write(&path, &read(source)?)?;
            OutputRecord::file(path)
        }
    };
    Ok(record)
}

fn read(path: &Path) -> Result<Vec<u8>, BundlerError> {
    std::fs::read(path)
        .map_err(|e| BundlerError::InvalidResult(format!("{}: {}", path.display(), e)))
}

fn write(path: &Path, content: &[u8]) -> Result<(), BundlerError> {
    let io = |e: std::io::Error| BundlerError::Prepare(format!("{}: {}", path.display(), e));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(path, content).map_err(io)
}
