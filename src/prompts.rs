//! Prompt templates for the AI endpoints.

use crate::models::{ExploreRequest, PackingRequest};

pub fn destination_guide(req: &ExploreRequest) -> String {
    format!(
        r#"You are a travel expert. Provide detailed information about the destination "{query}" for someone interested in "{experience}" traveling from {from} to {to}.

Return ONLY valid JSON (no markdown, no code blocks) with these exact keys:
{{
  "attractions": ["attraction 1", "attraction 2", ...],
  "best_time": "description of best times to visit",
  "transportation": ["option 1", "option 2", "option 3"],
  "accommodation": [{{"name": "Hotel/Type", "price_range": "₹X,XXX - ₹X,XXX per night"}}],
  "weather": "brief weather description",
  "estimated_budget": "₹X,XXX - ₹X,XXX per day",
  "personalized_suggestions": ["suggestion 1", "suggestion 2", "suggestion 3"]
}}

Keep each section concise but informative. Use INR (₹) for all prices."#,
        query = req.query.trim(),
        experience = req.experience.trim(),
        from = req.date_range.from,
        to = req.date_range.to,
    )
}

pub fn packing_list(req: &PackingRequest) -> String {
    format!(
        r#"Generate a packing list for a trip to {destination} from {start} to {end}.

Return ONLY valid JSON (no markdown) with this structure:
{{
  "items": [
    {{"category": "clothing", "name": "T-shirts", "quantity": 4}},
    {{"category": "toiletries", "name": "Toothbrush", "quantity": 1}},
    ...
  ]
}}

Categories: clothing, toiletries, electronics, documents, medicine, other
Include 15-20 essential items."#,
        destination = req.destination.trim(),
        start = req.start_date,
        end = req.end_date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateRange;

    #[test]
    fn guide_prompt_names_destination_and_dates() {
        let prompt = destination_guide(&ExploreRequest {
            query: " Udaipur ".into(),
            experience: "lakes and palaces".into(),
            date_range: DateRange {
                from: "2026-11-01".into(),
                to: "2026-11-05".into(),
            },
        });

        assert!(prompt.contains(r#"destination "Udaipur""#));
        assert!(prompt.contains("from 2026-11-01 to 2026-11-05"));
        assert!(prompt.contains(r#""personalized_suggestions""#));
    }

    #[test]
    fn packing_prompt_lists_categories() {
        let prompt = packing_list(&PackingRequest {
            destination: "Leh".into(),
            start_date: "2026-06-01".into(),
            end_date: "2026-06-10".into(),
        });

        assert!(prompt.starts_with("Generate a packing list for a trip to Leh"));
        assert!(prompt.contains("medicine"));
    }
}
