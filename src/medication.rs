// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! In-memory medication reference table.

use serde::Serialize;

/// Reference data for one medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MedicationInfo {
    pub name: &'static str,
    pub active_ingredient: &'static str,
    pub dosage_forms: &'static str,
    pub usage: &'static str,
    pub side_effects: &'static str,
    pub warnings: &'static str,
    pub interactions: &'static str,
    pub pregnancy_category: &'static str,
}

static MEDICATIONS: [MedicationInfo; 3] = [
    MedicationInfo {
        name: "Aricept",
        active_ingredient: "Donepezil",
        dosage_forms: "Tablets: 5mg, 10mg, 23mg",
        usage: "Treatment of mild to moderate Alzheimer's disease",
        side_effects: "Nausea, diarrhea, insomnia, fatigue, vomiting, muscle cramps",
        warnings: "May cause slow heart rate. Use with caution in patients with cardiac conditions.",
        interactions: "NSAIDs, anticholinergic medications, ketoconazole, quinidine",
        pregnancy_category: "C - Risk cannot be ruled out",
    },
    MedicationInfo {
        name: "Namenda",
        active_ingredient: "Memantine",
        dosage_forms: "Tablets: 5mg, 10mg; Solution: 2mg/mL",
        usage: "Treatment of moderate to severe Alzheimer's disease",
        side_effects: "Dizziness, headache, confusion, constipation",
        warnings: "Adjust dosage in patients with renal impairment",
        interactions: "NMDA antagonists, carbonic anhydrase inhibitors, sodium bicarbonate",
        pregnancy_category: "B - No evidence of risk in humans",
    },
    MedicationInfo {
        name: "Exelon",
        active_ingredient: "Rivastigmine",
        dosage_forms: "Capsules: 1.5mg, 3mg, 4.5mg, 6mg; Patch: 4.6mg/24h, 9.5mg/24h",
        usage: "Treatment of mild to moderate Alzheimer's disease and Parkinson's disease dementia",
        side_effects: "Nausea, vomiting, decreased appetite, dizziness",
        warnings: "Significant gastrointestinal adverse reactions including nausea and vomiting",
        interactions: "Cholinomimetic and anticholinergic medications",
        pregnancy_category: "B - No evidence of risk in humans",
    },
];

/// Look up a medication by name: exact match first, then case-insensitive.
#[must_use]
pub fn lookup_medication(name: &str) -> Option<&'static MedicationInfo> {
    MEDICATIONS
        .iter()
        .find(|med| med.name == name)
        .or_else(|| MEDICATIONS.iter().find(|med| med.name.eq_ignore_ascii_case(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_exact_and_case_insensitive() {
        assert_eq!(lookup_medication("Aricept").unwrap().active_ingredient, "Donepezil");
        assert_eq!(lookup_medication("nAMENDA").unwrap().name, "Namenda");
        assert!(lookup_medication("Tylenol").is_none());
        assert!(lookup_medication("").is_none());
    }
}
