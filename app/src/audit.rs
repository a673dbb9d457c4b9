// ==============================================================================
// audit.rs - Run Audit Trail
// ==============================================================================
// Description: Structured record of what a run read, wrote and where it failed
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 1.0.0
// ==============================================================================
// Events always go to the tracing log; when an audit log path is configured
// they are also appended to it as JSON lines.
// ==============================================================================

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    RunStarted,
    StageCompleted,
    ArtifactWritten,
    CompressionLaunched,
    RunCompleted,
    RunFailed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Error,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub resource: Option<String>,
    pub details: serde_json::Value,
    pub severity: LogSeverity,
}

impl AuditEvent {
    pub fn new(
        run_id: Uuid,
        event_type: AuditEventType,
        resource: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        let severity = match event_type {
            AuditEventType::RunFailed => LogSeverity::Error,
            _ => LogSeverity::Info,
        };

        Self {
            id: Uuid::new_v4(),
            run_id,
            timestamp: Utc::now(),
            event_type,
            resource,
            details,
            severity,
        }
    }
}

/// Audit sink for one run
pub struct AuditTrail {
    run_id: Uuid,
    log_path: Option<PathBuf>,
}

impl AuditTrail {
    pub fn new(log_path: Option<PathBuf>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            log_path,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Record an event
    ///
    /// A failure to append to the audit file is logged, never fatal to the run.
    pub fn log_event(
        &self,
        event_type: AuditEventType,
        resource: Option<String>,
        details: serde_json::Value,
    ) {
        let event = AuditEvent::new(self.run_id, event_type, resource, details);

        match event.severity {
            LogSeverity::Error => error!(
                run_id = %event.run_id,
                event = ?event.event_type,
                resource = ?event.resource,
                details = %event.details,
                "audit"
            ),
            LogSeverity::Info => info!(
                run_id = %event.run_id,
                event = ?event.event_type,
                resource = ?event.resource,
                details = %event.details,
                "audit"
            ),
        }

        if let Some(path) = &self.log_path {
            if let Err(e) = append_event(path, &event) {
                warn!("Failed to write audit event to {:?}: {:#}", path, e);
            }
        }
    }
}

fn append_event(path: &Path, event: &AuditEvent) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open audit log {:?}", path))?;

    let line = serde_json::to_string(event)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// SHA-256 of a file, hex encoded
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
