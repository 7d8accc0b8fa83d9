//! Subprocess backend for every collaborator role.
//!
//! Each call runs `<program> [args..] <verb> [verb args..]`. Requests that
//! carry data go to stdin as JSON; responses come back on stdout as JSON.
//! A non-zero exit status is reported with the helper's stderr.

use async_trait::async_trait;
use hca_common::{
    AlignmentReport, ClusterRequest, ClusteringEngine, CollaboratorError, Dendrogram,
    LoadedStructure, PlotRenderer, RenderOptions, StructureAligner, StructureSource,
};
use hca_config::BackendConfig;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct CommandBridge {
    program: String,
    args: Vec<String>,
}

impl CommandBridge {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    async fn invoke(
        &self,
        verb: &str,
        verb_args: Vec<OsString>,
        input: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, CollaboratorError> {
        debug!(program = %self.program, verb, "Invoking collaborator");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(verb)
            .args(&verb_args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollaboratorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(&bytes).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(CollaboratorError::Failed {
                program: self.program.clone(),
                verb: verb.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        trace!(verb, bytes = output.stdout.len(), "Collaborator responded");
        Ok(output.stdout)
    }

    fn decode<T: DeserializeOwned>(&self, verb: &str, bytes: &[u8]) -> Result<T, CollaboratorError> {
        serde_json::from_slice(bytes).map_err(|source| CollaboratorError::Protocol {
            program: self.program.clone(),
            verb: verb.to_string(),
            source,
        })
    }

    fn encode<T: serde::Serialize>(&self, verb: &str, value: &T) -> Result<Vec<u8>, CollaboratorError> {
        serde_json::to_vec(value).map_err(|source| CollaboratorError::Protocol {
            program: self.program.clone(),
            verb: verb.to_string(),
            source,
        })
    }
}

#[async_trait]
impl StructureSource for CommandBridge {
    async fn load(&self, path: &Path) -> Result<LoadedStructure, CollaboratorError> {
        let stdout = self.invoke("load", vec![path.into()], None).await?;
        self.decode("load", &stdout)
    }
}

#[async_trait]
impl StructureAligner for CommandBridge {
    async fn align(
        &self,
        moving: &LoadedStructure,
        reference: &LoadedStructure,
    ) -> Result<AlignmentReport, CollaboratorError> {
        let args = vec![moving.source.clone().into(), reference.source.clone().into()];
        let stdout = self.invoke("align", args, None).await?;
        if stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(AlignmentReport::default());
        }
        self.decode("align", &stdout)
    }
}

#[async_trait]
impl ClusteringEngine for CommandBridge {
    async fn cluster(&self, request: &ClusterRequest) -> Result<Dendrogram, CollaboratorError> {
        let body = self.encode("cluster", request)?;
        let stdout = self.invoke("cluster", vec![], Some(body)).await?;
        self.decode("cluster", &stdout)
    }
}

#[async_trait]
impl PlotRenderer for CommandBridge {
    async fn render(
        &self,
        plot: &Dendrogram,
        destination: &Path,
        options: &RenderOptions,
    ) -> Result<(), CollaboratorError> {
        let mut args: Vec<OsString> = vec![
            destination.into(),
            "--dpi".into(),
            options.dpi.to_string().into(),
            "--title".into(),
            options.title.clone().into(),
        ];
        if options.tight_bbox {
            args.push("--tight".into());
        }
        let body = self.encode("render", plot)?;
        self.invoke("render", args, Some(body)).await?;
        Ok(())
    }

    fn release(&self, plot: &Dendrogram) {
        // Each render runs in its own process, so nothing outlives the call.
        trace!(metric = %plot.metric, "Plot released");
    }
}
