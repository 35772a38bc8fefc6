use crate::math::StatsHelper;
use crate::processing::{AttritionCounts, CloudFreeScene, Stage};
use log::info;

/// Renders per-stage attrition as report lines.
///
/// Percentages are relative to the cells inside the requested area.
pub fn attrition_lines(counts: &AttritionCounts) -> Vec<String> {
    let total = counts.total();
    if total == 0 {
        return vec!["None of the selected data was within the requested area.".to_string()];
    }

    let mut lines = vec![format!("Total: {}", group_thousands(total))];
    for stage in Stage::ALL.iter().filter(|stage| **stage != Stage::Spatial) {
        let excluded = counts.excluded(*stage);
        lines.push(format!(
            "- {}: {} ({:.2}%)",
            stage,
            group_thousands(excluded),
            StatsHelper::percentage(excluded, total)
        ));
    }
    let surviving = counts.surviving();
    lines.push(format!(
        "Remaining: {} ({:.2}%)",
        group_thousands(surviving),
        StatsHelper::percentage(surviving, total)
    ));
    lines
}

pub fn log_attrition(counts: &AttritionCounts) {
    for line in attrition_lines(counts) {
        info!("{line}");
    }
}

pub fn log_most_cloud_free(scene: Option<&CloudFreeScene>) {
    match scene {
        Some(scene) => info!(
            "Most cloud-free scene: {} (mean cloud cover {:.4})",
            scene.scene_ref, scene.mean_cloud_cover
        ),
        None => info!("No scene reported a cloud cover."),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_digits_in_threes() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(3_210_987), "3,210,987");
    }

    #[test]
    fn report_lists_every_stage_after_the_prefilter() {
        let counts = AttritionCounts {
            scanned: 1_200,
            spatial: 200,
            cloud_cover: 250,
            quality: 50,
            ..Default::default()
        };
        let lines = attrition_lines(&counts);
        assert_eq!(lines[0], "Total: 1,000");
        assert!(lines.contains(&"- Cloud: 250 (25.00%)".to_string()));
        assert!(lines.contains(&"- Quality: 50 (5.00%)".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("Remaining: 700 (70.00%)"));
        assert_eq!(lines.len(), Stage::ALL.len() + 1);
    }

    #[test]
    fn empty_area_gets_a_single_line() {
        let counts = AttritionCounts {
            scanned: 10,
            spatial: 10,
            ..Default::default()
        };
        assert_eq!(attrition_lines(&counts).len(), 1);
    }
}
