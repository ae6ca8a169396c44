//! Hardhat compilation output: artifact lookup, library linking and build
//! info.
//!
//! Hardhat writes one `<Name>.json` artifact per contract to
//! `artifacts/<sourceName>/<Name>.json`, next to a `<Name>.dbg.json` file that
//! points at the build info of the compilation.

use {
    crate::request::{Libraries, artifact_name},
    alloy::{json_abi::JsonAbi, primitives::Bytes},
    serde::{Deserialize, de::DeserializeOwned},
    std::{
        collections::BTreeMap,
        fs,
        io,
        ops::Range,
        path::{Path, PathBuf},
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("no compiled artifact found for contract {0}")]
    NotFound(String),
    #[error("contract name {name} is ambiguous, candidates: {candidates:?}")]
    Ambiguous {
        name: String,
        candidates: Vec<PathBuf>,
    },
    #[error("contract {contract} links library {library} but no address was given for it")]
    UnresolvedLibrary { contract: String, library: String },
    #[error("contract {contract} has an invalid link reference at byte {start}")]
    InvalidLinkReference { contract: String, start: usize },
    #[error("contract {0} has malformed bytecode")]
    InvalidBytecode(String),
    #[error("could not read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("artifact lookup did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
    #[error("malformed file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Library name to the byte ranges of its placeholders, grouped by the
/// source file declaring the library.
pub type LinkReferences = BTreeMap<String, BTreeMap<String, Vec<LinkOffset>>>;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct LinkOffset {
    pub start: usize,
    pub length: usize,
}

impl LinkOffset {
    /// Position of the placeholder in the hex encoded bytecode.
    fn hex_range(&self) -> Option<Range<usize>> {
        let start = self.start.checked_mul(2)?;
        let end = self.start.checked_add(self.length)?.checked_mul(2)?;
        Some(start..end)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardhatArtifact {
    pub contract_name: String,
    pub source_name: String,
    pub abi: JsonAbi,
    /// Hex creation code, possibly with `__$...$__` library placeholders.
    pub bytecode: String,
    #[serde(default)]
    pub link_references: LinkReferences,
}

impl HardhatArtifact {
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Creation code with every library placeholder replaced by the
    /// library's address. Libraries can be keyed by plain or fully-qualified
    /// name.
    pub fn link(&self, libraries: &Libraries) -> Result<Bytes, Error> {
        let mut code = self
            .bytecode
            .strip_prefix("0x")
            .unwrap_or(&self.bytecode)
            .to_owned();

        for (source, references) in &self.link_references {
            for (library, offsets) in references {
                let address = libraries
                    .get(library)
                    .or_else(|| libraries.get(&format!("{source}:{library}")))
                    .ok_or_else(|| Error::UnresolvedLibrary {
                        contract: self.contract_name.clone(),
                        library: library.clone(),
                    })?;
                let address = const_hex::encode(address);
                for offset in offsets {
                    let range = offset
                        .hex_range()
                        .filter(|range| offset.length == 20 && code.get(range.clone()).is_some())
                        .ok_or_else(|| Error::InvalidLinkReference {
                            contract: self.contract_name.clone(),
                            start: offset.start,
                        })?;
                    code.replace_range(range, &address);
                }
            }
        }

        for library in libraries.keys() {
            let name = artifact_name(library);
            if !self
                .link_references
                .values()
                .any(|references| references.contains_key(name))
            {
                tracing::debug!(
                    contract = %self.contract_name,
                    %library,
                    "library is not referenced, ignoring it"
                );
            }
        }

        const_hex::decode(&code)
            .map(Bytes::from)
            .map_err(|_| Error::InvalidBytecode(self.qualified_name()))
    }
}

/// The parts of a Hardhat build info needed for source verification.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    /// Full compiler version, e.g. `0.8.4+commit.c7e474f2`.
    pub solc_long_version: String,
    /// Standard JSON input the contracts were compiled from.
    pub input: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: PathBuf,
}

/// A directory of Hardhat artifacts.
#[derive(Clone, Debug)]
pub struct CompiledArtifacts {
    root: PathBuf,
}

impl CompiledArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locates the artifact of a contract given by plain or fully-qualified
    /// name.
    pub fn find(&self, contract: &str) -> Result<PathBuf, Error> {
        let file_name = format!("{}.json", artifact_name(contract));
        let mut candidates = Vec::new();
        collect(&self.root, &file_name, &mut candidates)?;

        if let Some((source, _)) = contract.rsplit_once(':') {
            candidates.retain(|path| path.parent().is_some_and(|dir| dir.ends_with(source)));
        }

        match candidates.len() {
            0 => Err(Error::NotFound(contract.to_string())),
            1 => Ok(candidates.remove(0)),
            _ => {
                candidates.sort();
                Err(Error::Ambiguous {
                    name: contract.to_string(),
                    candidates,
                })
            }
        }
    }

    pub async fn load(&self, contract: &str) -> Result<HardhatArtifact, Error> {
        self.blocking(contract, |compiled, contract| {
            read_json(&compiled.find(contract)?)
        })
        .await
    }

    /// Build info of the compilation that produced the contract.
    pub async fn build_info(&self, contract: &str) -> Result<BuildInfo, Error> {
        self.blocking(contract, |compiled, contract| {
            let debug_path = compiled.find(contract)?.with_extension("dbg.json");
            let debug: DebugFile = read_json(&debug_path)?;
            let dir = debug_path.parent().unwrap_or(Path::new("."));
            read_json(&dir.join(debug.build_info))
        })
        .await
    }

    /// Runs a directory walk off the async runtime.
    async fn blocking<T, F>(&self, contract: &str, lookup: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&Self, &str) -> Result<T, Error> + Send + 'static,
    {
        let compiled = self.clone();
        let contract = contract.to_owned();
        tokio::task::spawn_blocking(move || lookup(&compiled, &contract)).await?
    }
}

fn collect(dir: &Path, file_name: &str, found: &mut Vec<PathBuf>) -> Result<(), Error> {
    let io_error = |source| Error::Io {
        path: dir.to_owned(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            if !path.ends_with("build-info") {
                collect(&path, file_name, found)?;
            }
        } else if path.file_name().is_some_and(|name| name == file_name) {
            found.push(path);
        }
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let contents = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| Error::Malformed {
        path: path.to_owned(),
        source,
    })
}
