//! Formatting utilities (Telegram HTML lead listings, flow summaries).

use crate::domain::LeadSummary;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render leads as one numbered Telegram HTML message of at most `max_chars`.
///
/// Email and LinkedIn lines appear only when the enrich phase revealed them.
/// Whole entries that do not fit are dropped and counted in a closing line.
pub fn format_lead_list(leads: &[LeadSummary], max_chars: usize) -> String {
    let mut out = format!("🔥 <b>Top {} Leads</b> 🔥\n\n", leads.len());
    let mut used = out.chars().count();

    for (i, lead) in leads.iter().enumerate() {
        let entry = format_lead(i + 1, lead);
        let len = entry.chars().count();
        let remaining = leads.len() - i;
        let tail = if remaining > 1 {
            more_line(remaining - 1).chars().count()
        } else {
            0
        };
        if used + len + tail > max_chars {
            out.push_str(&more_line(remaining));
            return out;
        }
        used += len;
        out.push_str(&entry);
    }

    out
}

fn format_lead(n: usize, lead: &LeadSummary) -> String {
    let mut out = String::new();
    let name = lead.display_name();
    let name = if name.is_empty() { "N/A".to_string() } else { name };
    out.push_str(&format!("<b>{}. {}</b>\n", n, escape_html(&name)));

    let org = lead.organization_name.trim();
    let org = if org.is_empty() { "N/A" } else { org };
    out.push_str(&format!("🏢 Company: {}\n", escape_html(org)));

    if let Some(email) = lead.email.as_deref().filter(|e| !e.trim().is_empty()) {
        out.push_str(&format!("📧 Email: {}\n", escape_html(email.trim())));
    }
    if let Some(url) = lead.linkedin_url.as_deref().filter(|u| is_http_url(u)) {
        out.push_str(&format!(
            "🔗 <a href=\"{}\">LinkedIn</a>\n",
            escape_html(url.trim())
        ));
    }
    out.push_str("-----------------\n");
    out
}

fn more_line(n: usize) -> String {
    format!("…and {n} more\n")
}

fn is_http_url(s: &str) -> bool {
    let s = s.trim();
    s.starts_with("http://") || s.starts_with("https://")
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("<a&b>\""), "&lt;a&amp;b&gt;&quot;");
    }

    #[test]
    fn lead_list_numbers_entries_and_omits_unrevealed_fields() {
        let leads = vec![
            LeadSummary {
                full_name: "Jane <Doe>".to_string(),
                organization_name: "Acme & Co".to_string(),
                email: Some("jane@acme.test".to_string()),
                linkedin_url: Some("https://linkedin.com/in/jane".to_string()),
                ..Default::default()
            },
            LeadSummary {
                first_name: "John".to_string(),
                last_name: "Roe".to_string(),
                ..Default::default()
            },
        ];

        let html = format_lead_list(&leads, 4096);
        assert!(html.starts_with("🔥 <b>Top 2 Leads</b> 🔥"));
        assert!(html.contains("<b>1. Jane &lt;Doe&gt;</b>"));
        assert!(html.contains("🏢 Company: Acme &amp; Co"));
        assert!(html.contains("📧 Email: jane@acme.test"));
        assert!(html.contains("<a href=\"https://linkedin.com/in/jane\">LinkedIn</a>"));

        let second = html.split("<b>2. ").nth(1).unwrap();
        assert!(second.starts_with("John Roe</b>"));
        assert!(second.contains("🏢 Company: N/A"));
        assert!(!second.contains("📧"));
        assert!(!second.contains("🔗"));
    }

    #[test]
    fn lead_list_drops_whole_entries_past_the_limit() {
        let leads: Vec<LeadSummary> = (0..10)
            .map(|i| LeadSummary {
                full_name: format!("Lead number {i} with a fairly long name"),
                organization_name: "Organization".repeat(10),
                ..Default::default()
            })
            .collect();

        let html = format_lead_list(&leads, 600);
        assert!(html.chars().count() <= 600);
        assert!(html.starts_with("🔥 <b>Top 10 Leads</b> 🔥"));
        assert!(html.contains("<b>1. Lead number 0"));
        assert!(!html.contains("<b>10. "));
        assert!(html.trim_end().ends_with("more"));
        // No entry is cut in the middle of its markup.
        assert_eq!(html.matches("<b>").count(), html.matches("</b>").count());
    }

    #[test]
    fn lead_list_that_fits_has_no_more_line() {
        let leads = vec![LeadSummary {
            full_name: "Solo".to_string(),
            ..Default::default()
        }];
        assert!(!format_lead_list(&leads, 4096).contains("more"));
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 10), "héllo");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }
}
