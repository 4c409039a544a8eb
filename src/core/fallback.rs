//! Offline fallback responder
//!
//! When the completion endpoint cannot answer, the session replies from a fixed table of
//! keyword-triggered templates. Rules are evaluated in order and the first match wins, so
//! life-threatening keywords pre-empt every other topic wherever they appear in the text.
//! Every template carries the Rescue (1122) and Edhi (115) numbers.

use serde::Serialize;

/// Mandatory emergency numbers present in every template
pub const EMERGENCY_NUMBERS: [&str; 2] = ["1122", "115"];

/// Triage outcome of a fallback lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Emergency,
    Fever,
    Cough,
    General,
}

/// One `(keywords, template)` entry of the triage table
#[derive(Debug, Clone)]
pub struct FallbackRule {
    pub topic: Topic,
    /// Lowercase substrings; any one of them triggers the rule
    pub keywords: &'static [&'static str],
    pub template: &'static str,
}

impl FallbackRule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

/// Ordered rule table plus the reply used when nothing matches
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    rules: Vec<FallbackRule>,
    general: &'static str,
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self {
            rules: vec![
                FallbackRule {
                    topic: Topic::Emergency,
                    keywords: &["emergency", "urgent", "chest pain", "breathing"],
                    template: templates::EMERGENCY,
                },
                FallbackRule {
                    topic: Topic::Fever,
                    keywords: &["fever", "bukhar", "temperature"],
                    template: templates::FEVER,
                },
                FallbackRule {
                    topic: Topic::Cough,
                    keywords: &["cough", "khansi"],
                    template: templates::COUGH,
                },
            ],
            general: templates::GENERAL,
        }
    }
}

impl FallbackResponder {
    pub fn new(rules: Vec<FallbackRule>, general: &'static str) -> Self {
        Self { rules, general }
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    /// Pick the reply for raw user text
    pub fn respond(&self, text: &str) -> &'static str {
        self.lookup(text).1
    }

    /// Which topic the text triages to
    pub fn classify(&self, text: &str) -> Topic {
        self.lookup(text).0
    }

    fn lookup(&self, text: &str) -> (Topic, &'static str) {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| (rule.topic, rule.template))
            .unwrap_or((Topic::General, self.general))
    }
}

/// Reply templates, markdown-flavoured
pub mod templates {
    pub const EMERGENCY: &str = r#"🚨 **EMERGENCY RESPONSE**

If this is a medical emergency, please call immediately:
📞 **1122** - Pakistan Rescue Services
📞 **115** - Edhi Ambulance Service
📞 **1021** - Ambulance Service

For chest pain or breathing difficulties:
1. Stay calm and sit upright
2. Loosen tight clothing
3. If you have prescribed medication (like nitroglycerin), take it
4. Call emergency services immediately

I'm here to help, but for urgent medical situations, professional emergency care is essential."#;

    pub const FEVER: &str = r#"🌡️ **Fever Management Guidance**

**Immediate Care:**
• Take paracetamol 500mg every 6 hours (max 4 doses/day)
• Drink plenty of fluids - water, ORS, fresh juices
• Rest in a cool, well-ventilated room
• Use cool compresses on forehead

**Monitor for these warning signs:**
⚠️ Fever above 103°F (39.4°C)
⚠️ Difficulty breathing or chest pain
⚠️ Severe headache or neck stiffness
⚠️ Persistent vomiting or dehydration
⚠️ Confusion or altered consciousness

**When to seek immediate help:**
Call **1122** (Rescue) or **115** (Edhi) if fever is accompanied by severe symptoms.

*This is general guidance. For persistent fever or concerning symptoms, please consult a qualified doctor.*"#;

    pub const COUGH: &str = r#"😷 **Cough Care Guidance**

**Home Remedies:**
• Honey in warm water (2 tsp honey)
• Steam inhalation 2-3 times daily
• Avoid cold drinks and ice

**Avoid:**
• Smoking and secondhand smoke
• Dust and strong odors

**See a doctor if:**
⚠️ Cough persists for more than 2 weeks
⚠️ Blood in cough
⚠️ Chest pain or difficulty breathing
⚠️ High fever with cough

📞 **Emergency:** Call **1122** (Rescue) or **115** (Edhi) for severe breathing difficulties."#;

    pub const GENERAL: &str = r#"🏥 **HealthPK AI Assistant**

Thank you for reaching out. I'm here to provide health guidance and support.

**I can help you with:**
• Symptom analysis and health advice
• Medicine information and interactions
• First aid and emergency guidance
• Finding doctors and healthcare facilities
• Preventive health recommendations
• Mental health support

**For immediate medical emergencies:**
📞 **1122** - Pakistan Rescue Services
📞 **115** - Edhi Ambulance Service

**Important:** This guidance is for informational purposes only. Always consult qualified healthcare professionals for proper diagnosis and treatment.

How can I assist you with your health concerns today?"#;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_emergency_numbers(text: &str) -> bool {
        EMERGENCY_NUMBERS.iter().all(|n| text.contains(n))
    }

    #[test]
    fn test_emergency_outranks_fever() {
        let responder = FallbackResponder::default();
        let reply = responder.respond("I have a fever and chest pain");

        assert_eq!(reply, templates::EMERGENCY);
        assert!(has_emergency_numbers(reply));
        assert!(reply.contains("1021"));
    }

    #[test]
    fn test_urdu_fever_synonym() {
        let responder = FallbackResponder::default();
        assert_eq!(responder.respond("mujhe bukhar hai"), templates::FEVER);
        assert_eq!(responder.classify("High TEMPERATURE since morning"), Topic::Fever);
    }

    #[test]
    fn test_cough_and_synonym() {
        let responder = FallbackResponder::default();
        assert_eq!(responder.classify("dry cough at night"), Topic::Cough);
        assert_eq!(responder.classify("bohat khansi hai"), Topic::Cough);
    }

    #[test]
    fn test_fever_outranks_cough() {
        let responder = FallbackResponder::default();
        assert_eq!(responder.classify("cough with fever"), Topic::Fever);
    }

    #[test]
    fn test_breathing_with_cough_is_emergency() {
        let responder = FallbackResponder::default();
        assert_eq!(
            responder.classify("cough and trouble BREATHING"),
            Topic::Emergency
        );
    }

    #[test]
    fn test_unrelated_text_gets_general_template() {
        let responder = FallbackResponder::default();
        let reply = responder.respond("random unrelated text");

        assert_eq!(reply, templates::GENERAL);
        assert!(has_emergency_numbers(reply));
        assert_eq!(responder.classify(""), Topic::General);
    }

    #[test]
    fn test_every_template_has_both_numbers() {
        let responder = FallbackResponder::default();
        for rule in responder.rules() {
            assert!(
                has_emergency_numbers(rule.template),
                "{:?} template is missing an emergency number",
                rule.topic
            );
        }
        assert!(has_emergency_numbers(templates::GENERAL));
    }

    #[test]
    fn test_rule_order_is_data() {
        let responder = FallbackResponder::new(
            vec![
                FallbackRule {
                    topic: Topic::Cough,
                    keywords: &["cough"],
                    template: templates::COUGH,
                },
                FallbackRule {
                    topic: Topic::Emergency,
                    keywords: &["urgent"],
                    template: templates::EMERGENCY,
                },
            ],
            templates::GENERAL,
        );

        assert_eq!(responder.classify("urgent cough"), Topic::Cough);
    }
}
