//! On-disk model store.
//!
//! Layout under the store root:
//!
//! ```text
//! manifests/<registry>/<namespace>/<name>/<tag>   JSON manifest
//! blobs/<digest>                                  content-addressed layers
//! unpacked/<name>:<tag>/                          extracted model directories
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};
use crate::manifest::{Manifest, MEDIA_TYPE_MODEL_MANIFEST};
use crate::reference::ModelReference;

pub const MODELS_DIR_ENV: &str = "MODELS_DIR";

const GGUF_MAGIC: &[u8; 4] = b"GGUF";
const TAR_MAGIC: &[u8; 5] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;

#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$MODELS_DIR`, or `$HOME/.models`.
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(MODELS_DIR_ENV) {
            return Self::new(dir);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Self::new(Path::new(&home).join(".models"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifests_root(&self) -> PathBuf {
        self.root.join("manifests")
    }

    pub fn manifest_path(&self, reference: &ModelReference) -> PathBuf {
        self.manifests_root()
            .join(&reference.registry)
            .join(&reference.namespace)
            .join(&reference.name)
            .join(&reference.tag)
    }

    pub fn blob_path(&self, digest: &str) -> PathBuf {
        self.root.join("blobs").join(digest)
    }

    pub fn unpacked_dir(&self, reference: &ModelReference) -> PathBuf {
        self.root
            .join("unpacked")
            .join(format!("{}:{}", reference.name, reference.tag))
    }

    /// Read the manifest and return it with the hex SHA-256 of its bytes.
    pub fn read_manifest(&self, reference: &ModelReference) -> StoreResult<(Manifest, String)> {
        let path = self.manifest_path(reference);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::ModelNotFound(reference.short_tagname()));
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let sha = format!("{:x}", Sha256::digest(&bytes));
        let manifest: Manifest = serde_json::from_slice(&bytes)?;
        if !manifest.media_type.is_empty() && manifest.media_type != MEDIA_TYPE_MODEL_MANIFEST {
            tracing::warn!(
                "Manifest for {} has unexpected media type {}",
                reference,
                manifest.media_type
            );
        }
        Ok((manifest, sha))
    }

    /// Check that the blob stored under `digest` hashes to `digest`.
    pub fn verify_blob(&self, digest: &str) -> StoreResult<()> {
        let path = self.blob_path(digest);
        let file = File::open(&path).map_err(|e| StoreError::io(&path, e))?;
        let (actual, _) = sha256_digest(file).map_err(|e| StoreError::io(&path, e))?;
        if actual != digest {
            return Err(StoreError::DigestMismatch {
                want: digest.to_string(),
                got: actual,
            });
        }
        Ok(())
    }

    /// All models with a manifest in the store, sorted by full tag name.
    pub fn list(&self) -> StoreResult<Vec<ModelReference>> {
        let root = self.manifests_root();
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        collect_files(&root, &mut files)?;

        let mut models: Vec<ModelReference> = files
            .iter()
            .filter_map(|path| {
                let rel = path.strip_prefix(&root).ok()?;
                let parts: Vec<&str> = rel.iter().filter_map(|c| c.to_str()).collect();
                match parts.as_slice() {
                    [registry, namespace, name, tag] => Some(ModelReference {
                        scheme: crate::reference::DEFAULT_PROTOCOL_SCHEME.into(),
                        registry: registry.to_string(),
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                        tag: tag.to_string(),
                    }),
                    _ => {
                        tracing::debug!("Skipping stray manifest entry {}", rel.display());
                        None
                    }
                }
            })
            .collect();

        models.sort_by_key(|m| m.full_tagname());
        Ok(models)
    }

    /// Map a model identifier to a GGUF weights file.
    ///
    /// Tried in order: an existing file, an existing model directory,
    /// the store's unpacked directory for the reference, and finally the
    /// first weights layer of the reference's manifest. A tar-packed layer
    /// is extracted into the unpacked directory on first use.
    pub fn locate_weights(&self, identifier: &str, verify_digests: bool) -> StoreResult<PathBuf> {
        let direct = Path::new(identifier);
        if direct.is_file() {
            tracing::debug!("Using weights file {}", direct.display());
            return Ok(direct.to_path_buf());
        }
        if direct.is_dir() {
            return find_gguf_in_dir(direct);
        }

        let reference: ModelReference = identifier.parse()?;

        let unpacked = self.unpacked_dir(&reference);
        if unpacked.is_dir() {
            tracing::debug!("Using unpacked model at {}", unpacked.display());
            return find_gguf_in_dir(&unpacked);
        }

        let (manifest, _) = self.read_manifest(&reference)?;
        let model = reference.short_tagname();

        let format = &manifest.weights.format;
        if !format.is_empty() && !format.eq_ignore_ascii_case("gguf") {
            return Err(StoreError::UnsupportedWeights {
                model,
                reason: format!("format {format:?} is not gguf"),
            });
        }

        let layer = manifest
            .primary_weights()
            .ok_or_else(|| StoreError::NoWeightsLayer {
                model: model.clone(),
            })?;

        if verify_digests {
            self.verify_blob(&layer.digest)?;
        }

        let blob = self.blob_path(&layer.digest);
        match sniff_layer(&blob)? {
            LayerKind::Gguf => {
                tracing::info!("Resolved {} to blob {}", model, layer.digest);
                Ok(blob)
            }
            LayerKind::Tar => {
                let dir = self.unpack_weights(&reference, &manifest, verify_digests)?;
                tracing::info!("Unpacked {} into {}", model, dir.display());
                find_gguf_in_dir(&dir)
            }
            LayerKind::Unknown => Err(StoreError::UnsupportedWeights {
                model,
                reason: "weights layer is neither a GGUF file nor a tar archive".into(),
            }),
        }
    }

    /// Extract every tar-packed weights layer into `unpacked_dir(reference)`.
    ///
    /// Layers land in a staging directory first, which is renamed into place
    /// only once all of them extracted.
    fn unpack_weights(
        &self,
        reference: &ModelReference,
        manifest: &Manifest,
        verify_digests: bool,
    ) -> StoreResult<PathBuf> {
        let target = self.unpacked_dir(reference);
        let staging = self
            .root
            .join("unpacked")
            .join(format!(".{}:{}.partial", reference.name, reference.tag));

        if staging.exists() {
            std::fs::remove_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;
        }
        std::fs::create_dir_all(&staging).map_err(|e| StoreError::io(&staging, e))?;

        for (i, layer) in manifest.weights.file.iter().enumerate() {
            // The primary layer was verified by the caller.
            if verify_digests && i > 0 {
                self.verify_blob(&layer.digest)?;
            }
            let blob = self.blob_path(&layer.digest);
            if sniff_layer(&blob)? != LayerKind::Tar {
                tracing::debug!("Skipping non-tar weights layer {}", layer.digest);
                continue;
            }

            tracing::debug!("Extracting layer {}", layer.digest);
            let file = File::open(&blob).map_err(|e| StoreError::io(&blob, e))?;
            tar::Archive::new(file)
                .unpack(&staging)
                .map_err(|e| StoreError::io(&blob, e))?;
        }

        std::fs::rename(&staging, &target).map_err(|e| StoreError::io(&target, e))?;
        Ok(target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerKind {
    Gguf,
    Tar,
    Unknown,
}

/// Classify a blob by its magic bytes: `GGUF` at offset 0, `ustar` at 257.
fn sniff_layer(path: &Path) -> StoreResult<LayerKind> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let mut head = Vec::with_capacity(TAR_MAGIC_OFFSET + TAR_MAGIC.len());
    file.take((TAR_MAGIC_OFFSET + TAR_MAGIC.len()) as u64)
        .read_to_end(&mut head)
        .map_err(|e| StoreError::io(path, e))?;

    if head.starts_with(GGUF_MAGIC) {
        Ok(LayerKind::Gguf)
    } else if head.get(TAR_MAGIC_OFFSET..) == Some(&TAR_MAGIC[..]) {
        Ok(LayerKind::Tar)
    } else {
        Ok(LayerKind::Unknown)
    }
}

/// Hash a reader, returning `sha256:<hex>` and the byte count.
pub fn sha256_digest(mut reader: impl Read) -> io::Result<(String, u64)> {
    let mut hasher = Sha256::new();
    let n = io::copy(&mut reader, &mut hasher)?;
    Ok((format!("sha256:{:x}", hasher.finalize()), n))
}

fn find_gguf_in_dir(dir: &Path) -> StoreResult<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("gguf"))
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::WeightsNotFound(dir.display().to_string()))
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> StoreResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
