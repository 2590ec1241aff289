use crate::{
    ContentDelta, ModelResponse, ModelUsage, Part, PartDelta, PartialModelResponse, TextPart,
};
use std::collections::BTreeMap;

/// Manages the accumulation and merging of content deltas for streaming
/// responses
pub struct StreamAccumulator {
    /// Text accumulated per part index, `BTreeMap` keeps parts in order
    accumulated_parts: BTreeMap<usize, String>,
    accumulated_usage: Option<ModelUsage>,
}

impl StreamAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accumulated_parts: BTreeMap::new(),
            accumulated_usage: None,
        }
    }

    /// Adds a partial response to the accumulator.
    pub fn add_partial(&mut self, partial: &PartialModelResponse) {
        if let Some(delta) = &partial.delta {
            self.process_delta(delta);
        }
        if let Some(usage) = &partial.usage {
            self.accumulated_usage
                .get_or_insert_with(ModelUsage::default)
                .add(usage);
        }
    }

    /// Computes the final response from accumulated deltas. A stream that
    /// produced no text yields a response with empty content.
    #[must_use]
    pub fn compute_response(self) -> ModelResponse {
        ModelResponse {
            content: self
                .accumulated_parts
                .into_values()
                .map(|text| Part::Text(TextPart { text }))
                .collect(),
            usage: self.accumulated_usage,
        }
    }

    /// The text accumulated so far, parts joined in index order.
    #[must_use]
    pub fn text(&self) -> String {
        self.accumulated_parts.values().map(String::as_str).collect()
    }

    pub fn clear(&mut self) {
        self.accumulated_parts.clear();
        self.accumulated_usage = None;
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.accumulated_parts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accumulated_parts.is_empty()
    }

    fn process_delta(&mut self, delta: &ContentDelta) {
        match &delta.part {
            PartDelta::Text(text_delta) => {
                self.accumulated_parts
                    .entry(delta.index)
                    .or_default()
                    .push_str(&text_delta.text);
            }
        }
    }
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextPartDelta;

    fn text_partial(index: usize, text: &str) -> PartialModelResponse {
        PartialModelResponse {
            delta: Some(ContentDelta {
                index,
                part: PartDelta::Text(TextPartDelta {
                    text: text.to_string(),
                }),
            }),
            usage: None,
        }
    }

    #[test]
    fn merges_text_deltas_by_index() {
        let mut accumulator = StreamAccumulator::new();
        accumulator.add_partial(&text_partial(0, "Hello"));
        accumulator.add_partial(&text_partial(1, "Second"));
        accumulator.add_partial(&text_partial(0, ", world"));

        assert_eq!(accumulator.size(), 2);
        assert_eq!(accumulator.text(), "Hello, worldSecond");

        let response = accumulator.compute_response();
        assert_eq!(
            response.content,
            vec![Part::text("Hello, world"), Part::text("Second")]
        );
    }

    #[test]
    fn sums_usage_across_partials() {
        let mut accumulator = StreamAccumulator::new();
        accumulator.add_partial(&text_partial(0, "Hi"));
        for (input_tokens, output_tokens) in [(10, 2), (0, 5)] {
            accumulator.add_partial(&PartialModelResponse {
                delta: None,
                usage: Some(ModelUsage {
                    input_tokens,
                    output_tokens,
                }),
            });
        }

        let response = accumulator.compute_response();
        assert_eq!(
            response.usage,
            Some(ModelUsage {
                input_tokens: 10,
                output_tokens: 7,
            })
        );
    }

    #[test]
    fn empty_stream_yields_empty_content() {
        let accumulator = StreamAccumulator::new();
        assert!(accumulator.is_empty());
        let response = accumulator.compute_response();
        assert!(response.content.is_empty());
        assert_eq!(response.text(), "");
    }
}
