pub mod png;

use regex::Regex;
use std::fmt;

const NEGATIVE_MARKER: &str = "Negative prompt:";
const STEPS_MARKER: &str = "Steps:";

/// One named slot of the generation-parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Positive,
    Negative,
    Steps,
    Sampler,
    CfgScale,
    Seed,
    Size,
    Model,
    DenoisingStrength,
    ClipSkip,
    HiresUpscale,
    HiresSteps,
    HiresUpscaler,
    LoraHashes,
}

impl MetadataField {
    /// Schema order. Field iteration and "search everything" scope follow it.
    pub const ALL: [MetadataField; 14] = [
        MetadataField::Positive,
        MetadataField::Negative,
        MetadataField::Steps,
        MetadataField::Sampler,
        MetadataField::CfgScale,
        MetadataField::Seed,
        MetadataField::Size,
        MetadataField::Model,
        MetadataField::DenoisingStrength,
        MetadataField::ClipSkip,
        MetadataField::HiresUpscale,
        MetadataField::HiresSteps,
        MetadataField::HiresUpscaler,
        MetadataField::LoraHashes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetadataField::Positive => "Positive",
            MetadataField::Negative => "Negative",
            MetadataField::Steps => "Steps",
            MetadataField::Sampler => "Sampler",
            MetadataField::CfgScale => "CFG scale",
            MetadataField::Seed => "Seed",
            MetadataField::Size => "Size",
            MetadataField::Model => "Model",
            MetadataField::DenoisingStrength => "Denoising strength",
            MetadataField::ClipSkip => "Clip skip",
            MetadataField::HiresUpscale => "Hires upscale",
            MetadataField::HiresSteps => "Hires steps",
            MetadataField::HiresUpscaler => "Hires upscaler",
            MetadataField::LoraHashes => "Lora hashes",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

lazy_static::lazy_static! {
    // Label-anchored `Label: value` pairs. A value runs to the next comma or
    // end of text; Lora hashes is quoted and ends at the closing quote.
    static ref LABEL_PATTERNS: Vec<(MetadataField, Regex)> = MetadataField::ALL
        .iter()
        .filter(|field| !matches!(field, MetadataField::Positive | MetadataField::Negative))
        .map(|&field| {
            let label = regex::escape(field.label());
            let pattern = match field {
                MetadataField::LoraHashes => format!(r#"{}: "(.*?)"(?:,|$)"#, label),
                _ => format!(r"{}: (.*?)(?:,|$)", label),
            };
            let re = Regex::new(&pattern).expect("static label pattern is valid");
            (field, re)
        })
        .collect();
}

/// Fixed-schema view of an embedded generation-parameter blob.
///
/// Every field is optional: a label missing from the blob simply leaves its
/// slot empty. The record is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMetadata {
    pub positive: Option<String>,
    pub negative: Option<String>,
    pub steps: Option<String>,
    pub sampler: Option<String>,
    pub cfg_scale: Option<String>,
    pub seed: Option<String>,
    pub size: Option<String>,
    pub model: Option<String>,
    pub denoising_strength: Option<String>,
    pub clip_skip: Option<String>,
    pub hires_upscale: Option<String>,
    pub hires_steps: Option<String>,
    pub hires_upscaler: Option<String>,
    pub lora_hashes: Option<String>,
}

impl ParsedMetadata {
    /// Parse a raw parameters blob. `None` yields the empty record.
    pub fn parse(blob: Option<&str>) -> Self {
        match blob {
            Some(text) => parse_parameters(text),
            None => Self::default(),
        }
    }

    pub fn get(&self, field: MetadataField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: MetadataField, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// Present fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (MetadataField, &str)> + '_ {
        MetadataField::ALL
            .iter()
            .filter_map(move |&field| self.get(field).map(|value| (field, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    fn slot(&self, field: MetadataField) -> &Option<String> {
        match field {
            MetadataField::Positive => &self.positive,
            MetadataField::Negative => &self.negative,
            MetadataField::Steps => &self.steps,
            MetadataField::Sampler => &self.sampler,
            MetadataField::CfgScale => &self.cfg_scale,
            MetadataField::Seed => &self.seed,
            MetadataField::Size => &self.size,
            MetadataField::Model => &self.model,
            MetadataField::DenoisingStrength => &self.denoising_strength,
            MetadataField::ClipSkip => &self.clip_skip,
            MetadataField::HiresUpscale => &self.hires_upscale,
            MetadataField::HiresSteps => &self.hires_steps,
            MetadataField::HiresUpscaler => &self.hires_upscaler,
            MetadataField::LoraHashes => &self.lora_hashes,
        }
    }

    fn slot_mut(&mut self, field: MetadataField) -> &mut Option<String> {
        match field {
            MetadataField::Positive => &mut self.positive,
            MetadataField::Negative => &mut self.negative,
            MetadataField::Steps => &mut self.steps,
            MetadataField::Sampler => &mut self.sampler,
            MetadataField::CfgScale => &mut self.cfg_scale,
            MetadataField::Seed => &mut self.seed,
            MetadataField::Size => &mut self.size,
            MetadataField::Model => &mut self.model,
            MetadataField::DenoisingStrength => &mut self.denoising_strength,
            MetadataField::ClipSkip => &mut self.clip_skip,
            MetadataField::HiresUpscale => &mut self.hires_upscale,
            MetadataField::HiresSteps => &mut self.hires_steps,
            MetadataField::HiresUpscaler => &mut self.hires_upscaler,
            MetadataField::LoraHashes => &mut self.lora_hashes,
        }
    }
}

/// Split a parameters blob into prompts and labelled settings.
///
/// Positive is everything before `Negative prompt:`; Negative runs from that
/// marker to the following `Steps:`. Neither prompt is recorded when its
/// closing marker is missing.
pub fn parse_parameters(params: &str) -> ParsedMetadata {
    let mut parsed = ParsedMetadata::default();

    if let Some(positive_end) = params.find(NEGATIVE_MARKER) {
        parsed.positive = Some(params[..positive_end].trim().to_string());

        let negative_start = positive_end + NEGATIVE_MARKER.len();
        if let Some(offset) = params[negative_start..].find(STEPS_MARKER) {
            let negative_end = negative_start + offset;
            parsed.negative = Some(params[negative_start..negative_end].trim().to_string());
        }
    }

    for (field, re) in LABEL_PATTERNS.iter() {
        if let Some(value) = re.captures(params).and_then(|caps| caps.get(1)) {
            parsed.set(*field, value.as_str().trim());
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_BLOB: &str = "masterpiece, a fox in the snow\nNegative prompt: blurry, watermark\nSteps: 30, Sampler: DPM++ 2M Karras, CFG scale: 7, Seed: 1234567890, Size: 512x768, Model: dreamshaper_8, Denoising strength: 0.45, Clip skip: 2, Hires upscale: 2, Hires steps: 15, Hires upscaler: Latent, Lora hashes: \"foxy: abc123, snow: def456\", Version: v1.7.0";

    #[test]
    fn test_parse_full_blob() {
        let parsed = parse_parameters(FULL_BLOB);
        assert_eq!(parsed.positive.as_deref(), Some("masterpiece, a fox in the snow"));
        assert_eq!(parsed.negative.as_deref(), Some("blurry, watermark"));
        assert_eq!(parsed.steps.as_deref(), Some("30"));
        assert_eq!(parsed.sampler.as_deref(), Some("DPM++ 2M Karras"));
        assert_eq!(parsed.cfg_scale.as_deref(), Some("7"));
        assert_eq!(parsed.seed.as_deref(), Some("1234567890"));
        assert_eq!(parsed.size.as_deref(), Some("512x768"));
        assert_eq!(parsed.model.as_deref(), Some("dreamshaper_8"));
        assert_eq!(parsed.denoising_strength.as_deref(), Some("0.45"));
        assert_eq!(parsed.clip_skip.as_deref(), Some("2"));
        assert_eq!(parsed.hires_upscale.as_deref(), Some("2"));
        assert_eq!(parsed.hires_steps.as_deref(), Some("15"));
        assert_eq!(parsed.hires_upscaler.as_deref(), Some("Latent"));
        assert_eq!(parsed.lora_hashes.as_deref(), Some("foxy: abc123, snow: def456"));
    }

    #[test]
    fn test_optional_labels_absent() {
        let blob = "a cat\nNegative prompt: ugly\nSteps: 20, Sampler: Euler a, CFG scale: 7, Seed: 1, Size: 512x512, Model: sd15";
        let parsed = parse_parameters(blob);
        assert_eq!(parsed.model.as_deref(), Some("sd15"));
        assert!(parsed.denoising_strength.is_none());
        assert!(parsed.clip_skip.is_none());
        assert!(parsed.hires_upscaler.is_none());
        assert!(parsed.lora_hashes.is_none());
    }

    #[test]
    fn test_no_negative_marker_leaves_prompts_empty() {
        let parsed = parse_parameters("just a prompt, Steps: 10, Seed: 42");
        assert!(parsed.positive.is_none());
        assert!(parsed.negative.is_none());
        assert_eq!(parsed.steps.as_deref(), Some("10"));
        assert_eq!(parsed.seed.as_deref(), Some("42"));
    }

    #[test]
    fn test_negative_without_steps() {
        let parsed = parse_parameters("sunset Negative prompt: lowres");
        assert_eq!(parsed.positive.as_deref(), Some("sunset"));
        assert!(parsed.negative.is_none());
    }

    #[test]
    fn test_no_blob_is_empty_record() {
        let parsed = ParsedMetadata::parse(None);
        assert!(parsed.is_empty());
        assert_eq!(parsed, ParsedMetadata::default());
    }

    #[test]
    fn test_fields_in_schema_order() {
        let parsed = parse_parameters("a\nNegative prompt: b\nSteps: 5, Seed: 9");
        let labels: Vec<_> = parsed.fields().map(|(field, _)| field).collect();
        assert_eq!(
            labels,
            vec![
                MetadataField::Positive,
                MetadataField::Negative,
                MetadataField::Steps,
                MetadataField::Seed,
            ]
        );
    }

    #[test]
    fn test_hires_steps_does_not_shadow_steps() {
        let parsed = parse_parameters("x Negative prompt: y Steps: 25, Hires steps: 10");
        assert_eq!(parsed.steps.as_deref(), Some("25"));
        assert_eq!(parsed.hires_steps.as_deref(), Some("10"));
    }
}
