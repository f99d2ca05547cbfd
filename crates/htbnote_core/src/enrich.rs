use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::TextDiff;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::EnrichError;
use crate::extract::{AssetUrlMatcher, LabelMatcher};
use crate::frontmatter::{Frontmatter, NewlineStyle, TrackedField};
use crate::merge::{image_link, render_block, splice, upsert_field};
use crate::plan::{FetchPlan, PlanInputs};
use crate::slug::{asset_filename, page_url, slugify};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct EnrichRequest {
    pub name: String,
    pub document_path: PathBuf,
    pub output_dir: PathBuf,
    /// Fetch and extract, but never download or write.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldUpdate {
    pub field: TrackedField,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichReport {
    pub slug: String,
    pub page_url: String,
    pub asset_path: PathBuf,
    pub frontmatter_found: bool,
    pub plan: FetchPlan,
    pub fetched: bool,
    pub asset_url: Option<String>,
    pub downloaded: bool,
    pub updated_fields: Vec<FieldUpdate>,
    pub document_written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// Values pulled from the machine page for this run.
#[derive(Debug, Default)]
struct Fetched {
    os: Option<String>,
    difficulty: Option<String>,
    asset_url: Option<String>,
}

pub fn enrich(
    request: &EnrichRequest,
    settings: &Settings,
    transport: &dyn Transport,
) -> Result<EnrichReport, EnrichError> {
    if !request.document_path.is_file() {
        return Err(EnrichError::MissingDocument(request.document_path.clone()));
    }
    if !request.output_dir.is_dir() {
        return Err(EnrichError::MissingOutputDir(request.output_dir.clone()));
    }

    let slug = slugify(&request.name);
    let page_url = page_url(&settings.base_url, &slug);
    let asset_name = asset_filename(&slug);
    let asset_path = request.output_dir.join(&asset_name);

    let original = fs::read_to_string(&request.document_path)
        .map_err(|source| EnrichError::io("read", &request.document_path, source))?;
    let frontmatter = Frontmatter::locate(&original);
    if frontmatter.is_none() {
        info!(
            document = %request.document_path.display(),
            "no frontmatter block at document start; the document will not be modified"
        );
    }

    let inputs = PlanInputs::read(frontmatter.as_ref(), asset_path.exists());
    let plan = FetchPlan::evaluate(&inputs);
    debug!(
        slug = %slug,
        os = ?inputs.os,
        difficulty = ?inputs.difficulty,
        image = ?inputs.image,
        asset_exists = inputs.asset_exists,
        ?plan,
        needs_fetch = plan.needs_fetch(),
        "evaluated fetch plan"
    );

    let mut report = EnrichReport {
        slug,
        page_url,
        asset_path,
        frontmatter_found: frontmatter.is_some(),
        plan,
        fetched: false,
        asset_url: None,
        downloaded: false,
        updated_fields: Vec::new(),
        document_written: false,
        diff: None,
    };

    let fetched = if plan.needs_fetch() {
        report.fetched = true;
        fetch_page_values(&report.page_url, &plan, settings, transport)?
    } else {
        debug!("all tracked fields satisfied; skipping page fetch");
        Fetched::default()
    };
    report.asset_url = fetched.asset_url.clone();

    if let Some(asset_url) = &fetched.asset_url {
        if request.dry_run {
            info!(url = %asset_url, "dry run; skipping avatar download");
        } else {
            debug!(url = %asset_url, path = %report.asset_path.display(), "downloading avatar");
            transport
                .download(asset_url, &report.asset_path)
                .map_err(|source| EnrichError::Transport {
                    url: asset_url.clone(),
                    source,
                })?;
            report.downloaded = true;
        }
    }

    let Some(frontmatter) = frontmatter else {
        return Ok(report);
    };

    let mut updates = Vec::new();
    if let Some(os) = fetched.os {
        updates.push(FieldUpdate {
            field: TrackedField::Os,
            value: os,
        });
    }
    if let Some(difficulty) = fetched.difficulty {
        updates.push(FieldUpdate {
            field: TrackedField::Difficulty,
            value: difficulty,
        });
    }
    // Link the avatar only once it is really on disk.
    if !plan.has_image_value && report.asset_path.exists() {
        updates.push(FieldUpdate {
            field: TrackedField::Image,
            value: image_link(&asset_name),
        });
    }

    if updates.is_empty() {
        debug!("no frontmatter fields to update");
        return Ok(report);
    }

    let updated = apply_updates(&original, &frontmatter, &updates);
    report.updated_fields = updates;
    if updated == original {
        debug!("document unchanged after merge");
        return Ok(report);
    }

    if request.dry_run {
        report.diff = Some(unified_diff(&original, &updated, &request.document_path));
        return Ok(report);
    }

    fs::write(&request.document_path, &updated)
        .map_err(|source| EnrichError::io("write", &request.document_path, source))?;
    report.document_written = true;
    info!(
        document = %request.document_path.display(),
        fields = report.updated_fields.len(),
        "updated frontmatter"
    );
    Ok(report)
}

fn fetch_page_values(
    url: &str,
    plan: &FetchPlan,
    settings: &Settings,
    transport: &dyn Transport,
) -> Result<Fetched, EnrichError> {
    debug!(url, "fetching machine page");
    let html = transport
        .fetch_text(url)
        .map_err(|source| EnrichError::Transport {
            url: url.to_string(),
            source,
        })?;

    let required = |label: &str| -> Result<String, EnrichError> {
        let matcher = LabelMatcher::new(label).map_err(|source| EnrichError::LabelPattern {
            label: label.to_string(),
            source,
        })?;
        matcher.extract(&html).ok_or_else(|| EnrichError::Extraction {
            label: label.to_string(),
            url: url.to_string(),
        })
    };
    let mut fetched = Fetched::default();
    if plan.needs_os {
        fetched.os = Some(required(settings.os_label.as_str())?);
    }
    if plan.needs_difficulty {
        fetched.difficulty = Some(required(settings.difficulty_label.as_str())?);
    }
    if plan.should_download_image {
        let matcher = AssetUrlMatcher::new(&settings.asset_url_prefix).map_err(|source| {
            EnrichError::AssetPattern {
                prefix: settings.asset_url_prefix.clone(),
                source,
            }
        })?;
        fetched.asset_url = matcher.find(&html);
        if fetched.asset_url.is_none() {
            warn!(url, "no avatar URL found on machine page");
        }
    }
    debug!(?fetched, "extracted page values");
    Ok(fetched)
}

fn apply_updates(original: &str, frontmatter: &Frontmatter, updates: &[FieldUpdate]) -> String {
    let newline = NewlineStyle::detect(original);
    let mut body = frontmatter.body().to_string();
    for update in updates {
        body = upsert_field(&body, update.field.key(), &update.value, newline);
    }
    splice(original, frontmatter.span(), &render_block(&body, newline))
}

fn unified_diff(original: &str, updated: &str, path: &Path) -> String {
    let label = path.display().to_string();
    TextDiff::from_lines(original, updated)
        .unified_diff()
        .header(&label, &label)
        .to_string()
}
