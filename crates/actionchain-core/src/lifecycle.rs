//! Owns the action chain directory: writes planned chunks and removes them,
//! together with the auxiliary files they reference, once they are done.

use crate::config::Config;
use crate::declaration::StateDeclaration;
use crate::endpoint::{Endpoint, EndpointLookup};
use crate::error::Result;
use crate::owner::DirectoryOwner;
use crate::paths;
use crate::planner::ChunkPlanner;
use crate::scanner::ReferenceScanner;
use crate::top::TopFile;
use crate::types::ActionChain;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

pub struct ActionChainGenerator {
    config: Config,
    owner: Box<dyn DirectoryOwner + Send + Sync>,
}

impl ActionChainGenerator {
    pub fn new(config: Config) -> Self {
        let owner = config.directory_owner();
        Self { config, owner }
    }

    /// Replace the ownership capability derived from the config.
    pub fn with_owner(mut self, owner: impl DirectoryOwner + Send + Sync + 'static) -> Self {
        self.owner = Box::new(owner);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn states_root(&self) -> &Path {
        &self.config.states_root
    }

    pub fn target_dir(&self) -> PathBuf {
        paths::actionchains_dir(self.states_root())
    }

    pub fn chunk_path(&self, chain_id: u64, machine_id: &str, chunk: u32) -> PathBuf {
        paths::chunk_path(self.states_root(), chain_id, machine_id, chunk)
    }

    // ---------------------------------------------------------------------------
    // Generation
    // ---------------------------------------------------------------------------

    /// Chunks each endpoint's declarations would produce, without writing.
    pub fn chunks_per_endpoint(
        &self,
        chain: &ActionChain,
        states: &[(Endpoint, Vec<StateDeclaration>)],
    ) -> Result<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for (endpoint, decls) in states {
            let chunks = ChunkPlanner::new(chain.id, endpoint).plan(decls.clone())?;
            counts.insert(endpoint.minion_id.clone(), chunks.len());
        }
        Ok(counts)
    }

    /// Plan `states` for `endpoint` and write one artifact per chunk.
    ///
    /// Returns the number of chunks written, keyed by minion id. Any error is
    /// fatal for this endpoint; malformed input fails before anything is written.
    pub fn create_chain_files(
        &self,
        chain: &ActionChain,
        endpoint: &Endpoint,
        states: Vec<StateDeclaration>,
        extra_filerefs: Option<&str>,
    ) -> Result<BTreeMap<String, usize>> {
        paths::validate_machine_id(&endpoint.machine_id)?;
        let chunks = ChunkPlanner::new(chain.id, endpoint)
            .with_extra_filerefs(extra_filerefs)
            .plan(states)?;

        let rendered = chunks
            .iter()
            .map(|chunk| crate::writer::render_chunk(chunk))
            .collect::<Result<Vec<_>>>()?;

        let dir = self.create_actionchains_dir()?;
        for (i, (chunk, data)) in chunks.iter().zip(&rendered).enumerate() {
            let number = i as u32 + 1;
            let path = dir.join(paths::chunk_file_name(chain.id, &endpoint.machine_id, number));
            crate::io::atomic_write(&path, data.as_bytes())?;
            tracing::debug!(path = %path.display(), states = chunk.len(), "wrote chunk");
        }
        tracing::info!(
            chain = chain.id,
            label = ?chain.label,
            minion = %endpoint.minion_id,
            chunks = chunks.len(),
            "generated action chain files"
        );

        let mut counts = BTreeMap::new();
        counts.insert(endpoint.minion_id.clone(), chunks.len());
        Ok(counts)
    }

    /// Write the top file for a highstate action and return its `salt://` reference.
    pub fn generate_top(&self, chain_id: u64, action_id: u64, top: &TopFile) -> Result<String> {
        let rel = paths::top_path(chain_id, action_id);
        self.create_actionchains_dir()?;
        let path = self.states_root().join(&rel);
        crate::io::atomic_write(&path, top.render()?.as_bytes())?;
        Ok(format!("{}{rel}", paths::SALT_FS_PREFIX))
    }

    /// Ensure the action chain directory exists. Ownership is assigned only
    /// when this call created it.
    pub fn create_actionchains_dir(&self) -> Result<PathBuf> {
        let dir = self.target_dir();
        if crate::io::ensure_dir(&dir)? {
            self.owner.assign(&dir)?;
        }
        Ok(dir)
    }

    // ---------------------------------------------------------------------------
    // Cleanup
    // ---------------------------------------------------------------------------

    /// Remove the artifact of `chunk` once it ran. If the chain failed, the
    /// chunks that will never run are removed too. Unknown minions are ignored.
    pub fn remove_chain_files(
        &self,
        chain_id: u64,
        minion_id: &str,
        chunk: u32,
        chain_failed: bool,
        lookup: &dyn EndpointLookup,
    ) -> Vec<PathBuf> {
        let Some(endpoint) = lookup.find_by_minion_id(minion_id) else {
            tracing::debug!(minion = minion_id, "no endpoint to clean up");
            return Vec::new();
        };
        let mut deleted =
            self.delete_artifact_and_refs(&self.chunk_path(chain_id, &endpoint.machine_id, chunk));
        if chain_failed {
            deleted.extend(self.remove_endpoint_files(&endpoint, Some(chain_id)));
        }
        deleted
    }

    /// Remove every chunk artifact of `endpoint`, for one chain or for all.
    pub fn remove_endpoint_files(&self, endpoint: &Endpoint, chain_id: Option<u64>) -> Vec<PathBuf> {
        let dir = self.target_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "error listing action chain files");
                return Vec::new();
            }
        };

        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_name().to_str().is_some_and(|name| {
                    paths::is_chunk_file_of(name, chain_id, &endpoint.machine_id)
                })
            })
            .map(|entry| entry.path())
            .collect();
        matches.sort();

        matches
            .iter()
            .flat_map(|path| self.delete_artifact_and_refs(path))
            .collect()
    }

    /// Delete one artifact and the auxiliary files only it references.
    ///
    /// Best effort: failures are logged and skipped, missing files are not
    /// errors. Returns the paths actually deleted.
    pub fn delete_artifact_and_refs(&self, artifact: &Path) -> Vec<PathBuf> {
        let scanner = ReferenceScanner::from_config(&self.config);
        let mut targets = vec![artifact.to_path_buf()];
        for reference in scanner.find_file_refs_to_delete(artifact) {
            if is_contained(&reference) {
                targets.push(self.states_root().join(&reference));
            } else {
                tracing::warn!(reference = %reference, "skipping reference outside the states root");
            }
        }

        let mut deleted = Vec::new();
        for path in targets {
            match crate::io::remove_if_exists(&path) {
                Ok(true) => deleted.push(path),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "error deleting action chain file")
                }
            }
        }
        deleted
    }
}

fn is_contained(reference: &str) -> bool {
    Path::new(reference)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
