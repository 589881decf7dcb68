use crate::data_models::{Lead, LeadStatus};

/// Tags leads by whether they publish a website, the only qualification
/// signal available from a place listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadClassifier;

impl LeadClassifier {
    pub fn classify(&self, mut lead: Lead) -> Lead {
        let has_website = lead
            .place
            .website
            .as_deref()
            .is_some_and(|w| !w.trim().is_empty());
        lead.status = if has_website {
            LeadStatus::Qualified
        } else {
            LeadStatus::Cold
        };
        lead
    }

    pub fn classify_all(&self, leads: Vec<Lead>) -> Vec<Lead> {
        leads.into_iter().map(|lead| self.classify(lead)).collect()
    }
}
