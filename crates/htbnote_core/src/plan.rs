use serde::Serialize;

use crate::frontmatter::{FieldValue, Frontmatter, TrackedField};

/// Current state read from the document and the output directory.
#[derive(Debug, Clone)]
pub struct PlanInputs {
    pub frontmatter_found: bool,
    pub os: FieldValue,
    pub difficulty: FieldValue,
    pub image: FieldValue,
    pub asset_exists: bool,
}

impl PlanInputs {
    pub fn read(frontmatter: Option<&Frontmatter>, asset_exists: bool) -> Self {
        let field = |tracked: TrackedField| {
            frontmatter
                .map(|frontmatter| frontmatter.field(tracked))
                .unwrap_or(FieldValue::Absent)
        };
        Self {
            frontmatter_found: frontmatter.is_some(),
            os: field(TrackedField::Os),
            difficulty: field(TrackedField::Difficulty),
            image: field(TrackedField::Image),
            asset_exists,
        }
    }
}

/// Which pieces of remote data this run needs. Computed once, then consulted by
/// every later step instead of re-deriving the decision at each use site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchPlan {
    pub needs_os: bool,
    pub needs_difficulty: bool,
    pub has_image_value: bool,
    pub should_download_image: bool,
}

impl FetchPlan {
    pub fn evaluate(inputs: &PlanInputs) -> Self {
        let needs_os = inputs.frontmatter_found && inputs.os.is_blank();
        let needs_difficulty = inputs.frontmatter_found && inputs.difficulty.is_blank();
        // Without a block there is no `_image` value, so only the file decides.
        let has_image_value = inputs.frontmatter_found && inputs.image.has_content();
        let should_download_image = !inputs.asset_exists && !has_image_value;
        Self {
            needs_os,
            needs_difficulty,
            has_image_value,
            should_download_image,
        }
    }

    /// One page fetch serves every need.
    pub fn needs_fetch(&self) -> bool {
        self.needs_os || self.needs_difficulty || self.should_download_image
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchPlan, PlanInputs};
    use crate::frontmatter::{FieldValue, Frontmatter};

    fn present(value: &str) -> FieldValue {
        FieldValue::Present(value.to_string())
    }

    fn inputs(os: FieldValue, difficulty: FieldValue, image: FieldValue, asset: bool) -> PlanInputs {
        PlanInputs {
            frontmatter_found: true,
            os,
            difficulty,
            image,
            asset_exists: asset,
        }
    }

    #[test]
    fn blank_fields_and_missing_asset_need_everything() {
        let plan = FetchPlan::evaluate(&inputs(present(""), present(""), present(""), false));
        assert!(plan.needs_os);
        assert!(plan.needs_difficulty);
        assert!(!plan.has_image_value);
        assert!(plan.should_download_image);
        assert!(plan.needs_fetch());
    }

    #[test]
    fn filled_document_with_asset_needs_nothing() {
        let plan = FetchPlan::evaluate(&inputs(
            present("windows"),
            present("easy"),
            present("\"[[htb_active.png]]\""),
            true,
        ));
        assert!(!plan.needs_fetch());
    }

    #[test]
    fn fields_are_evaluated_independently() {
        let plan = FetchPlan::evaluate(&inputs(present(""), present("hard"), present("x"), true));
        assert!(plan.needs_os);
        assert!(!plan.needs_difficulty);
        assert!(plan.needs_fetch());
    }

    #[test]
    fn existing_asset_suppresses_download_even_when_image_blank() {
        let plan = FetchPlan::evaluate(&inputs(present("linux"), present("easy"), present("''"), true));
        assert!(!plan.should_download_image);
        assert!(!plan.needs_fetch());
    }

    #[test]
    fn image_value_suppresses_download_without_asset() {
        let plan = FetchPlan::evaluate(&inputs(
            present("linux"),
            present("easy"),
            present("custom.png"),
            false,
        ));
        assert!(plan.has_image_value);
        assert!(!plan.should_download_image);
    }

    #[test]
    fn absent_keys_count_as_blank() {
        let plan = FetchPlan::evaluate(&inputs(
            FieldValue::Absent,
            FieldValue::Absent,
            FieldValue::Absent,
            false,
        ));
        assert!(plan.needs_os);
        assert!(plan.needs_difficulty);
        assert!(plan.should_download_image);
    }

    #[test]
    fn missing_frontmatter_only_keeps_the_image_decision() {
        let plan = FetchPlan::evaluate(&PlanInputs::read(None, false));
        assert!(!plan.needs_os);
        assert!(!plan.needs_difficulty);
        assert!(!plan.has_image_value);
        assert!(plan.should_download_image);

        let plan = FetchPlan::evaluate(&PlanInputs::read(None, true));
        assert!(!plan.needs_fetch());
    }

    #[test]
    fn read_pulls_values_from_block() {
        let frontmatter =
            Frontmatter::locate("---\n_difficulty: Medium\n_os:\n---\n").expect("frontmatter");
        let inputs = PlanInputs::read(Some(&frontmatter), false);
        assert!(inputs.frontmatter_found);
        assert_eq!(inputs.os, FieldValue::Present(String::new()));
        assert_eq!(inputs.difficulty, FieldValue::Present("Medium".to_string()));
        assert_eq!(inputs.image, FieldValue::Absent);
    }
}
