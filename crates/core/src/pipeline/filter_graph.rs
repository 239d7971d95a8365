//! Merges per-stream filter declarations into one clause per category.

use crate::stream::{FilterCategory, FilterConfiguration, Stream};

/// Builds the filter-graph argument block for a set of streams.
///
/// Entries are grouped by category (categories in first-seen order), sorted
/// by ascending stream index within a category (ties keep stream order), and
/// rendered as `[<index>] <name>=<value> ` joined with `;` inside one quoted
/// clause behind the category flag. Categories without entries are omitted.
pub fn build_filter_graph<'a, S, I>(streams: I) -> String
where
    S: Stream + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let configurations: Vec<FilterConfiguration> =
        streams.into_iter().flat_map(|s| s.filters()).collect();

    let mut categories: Vec<FilterCategory> = Vec::new();
    for config in &configurations {
        if !categories.contains(&config.category) {
            categories.push(config.category);
        }
    }

    categories
        .into_iter()
        .filter_map(|category| {
            let mut members: Vec<&FilterConfiguration> = configurations
                .iter()
                .filter(|c| c.category == category)
                .collect();
            members.sort_by_key(|c| c.stream_index);

            let entries: Vec<String> = members
                .iter()
                .flat_map(|c| {
                    c.filters
                        .iter()
                        .map(move |f| format!("[{}] {} ", c.stream_index, f.render()))
                })
                .collect();

            if entries.is_empty() {
                None
            } else {
                Some(format!("{} \"{}\"", category.flag(), entries.join(";")))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{AudioStream, MediaStream, SubtitleStream, VideoStream};

    #[test]
    fn test_no_filters_yields_empty_block() {
        let streams: Vec<MediaStream> = vec![
            VideoStream::new("a.mp4", 0).set_codec("libx264").into(),
            SubtitleStream::new("a.mp4", 2).into(),
        ];
        assert_eq!(build_filter_graph(&streams), "");
    }

    #[test]
    fn test_same_category_merged_in_index_order() {
        let streams: Vec<MediaStream> = vec![
            VideoStream::new("b.mp4", 3).reverse().into(),
            VideoStream::new("a.mp4", 1).change_speed(2.0).unwrap().into(),
        ];
        assert_eq!(
            build_filter_graph(&streams),
            "-filter_complex \"[1] setpts=0.5*PTS ;[3] reverse \""
        );
    }

    #[test]
    fn test_categories_get_separate_clauses() {
        let streams: Vec<MediaStream> = vec![
            VideoStream::new("a.mp4", 0).change_speed(1.5).unwrap().into(),
            AudioStream::new("a.mp4", 1).change_speed(1.5).unwrap().into(),
        ];
        assert_eq!(
            build_filter_graph(&streams),
            "-filter_complex \"[0] setpts=0.75*PTS \" -filter:a \"[1] atempo=1.5 \""
        );
    }

    #[test]
    fn test_multiple_filters_on_one_stream() {
        let streams: Vec<MediaStream> = vec![VideoStream::new("a.mp4", 0)
            .change_speed(0.5)
            .unwrap()
            .reverse()
            .into()];
        assert_eq!(
            build_filter_graph(&streams),
            "-filter_complex \"[0] setpts=2*PTS ;[0] reverse \""
        );
    }
}
