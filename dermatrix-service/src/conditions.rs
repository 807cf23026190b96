//! Static registry of the skin conditions the classifier can report.
//!
//! [`Label`] lists the conditions in the order of the model's output vector, and
//! every label maps to exactly one [`ConditionRecord`]. The table is compiled in
//! and never mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DetectionError, DetectionResult};

pub const LABEL_COUNT: usize = 10;

pub const ABOUT_TEXT: &str = "Dermatrix is an AI-powered tool designed to help identify and provide information about common skin conditions. The application uses deep learning technology to analyze images of skin and compare them against a database of known skin diseases.\n\nOur goal is to make skin health information more accessible and provide preliminary guidance. However, this tool should not replace professional medical advice. Always consult with a qualified healthcare provider for diagnosis and treatment of any skin condition.\n\nThe system can currently detect 10 different types of skin conditions with varying degrees of accuracy. The AI model is continuously being improved to provide more accurate results.";

pub const MEDICAL_DISCLAIMER: &str = "This application is intended for informational purposes only and is not a substitute for professional medical advice, diagnosis, or treatment. Always seek the advice of your physician or other qualified health provider with any questions you may have regarding a medical condition.";

pub const DETECTION_DISCLAIMER: &str = "For accurate assessment of disease severity, please consult a dermatologist for in-person examination.";

pub const CONTAGIOUS_NOTICE: &str = "Warning: This condition is contagious!";
pub const NOT_CONTAGIOUS_NOTICE: &str = "This condition is not contagious.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    Eczema,
    WartsMolluscum,
    Melanoma,
    AtopicDermatitis,
    BasalCellCarcinoma,
    MelanocyticNevi,
    BenignKeratosis,
    PsoriasisLichenPlanus,
    SeborrheicKeratoses,
    TineaRingworm,
}

impl Label {
    /// All labels, indexed like the classifier output
    pub const ALL: [Label; LABEL_COUNT] = [
        Label::Eczema,
        Label::WartsMolluscum,
        Label::Melanoma,
        Label::AtopicDermatitis,
        Label::BasalCellCarcinoma,
        Label::MelanocyticNevi,
        Label::BenignKeratosis,
        Label::PsoriasisLichenPlanus,
        Label::SeborrheicKeratoses,
        Label::TineaRingworm,
    ];

    pub fn from_index(index: usize) -> DetectionResult<Label> {
        Label::ALL
            .get(index)
            .copied()
            .ok_or_else(|| DetectionError::UnknownLabel(format!("class index {}", index)))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name, as shown to users
    pub fn name(self) -> &'static str {
        match self {
            Label::Eczema => "Eczema",
            Label::WartsMolluscum => "Warts Molluscum and other Viral Infections",
            Label::Melanoma => "Melanoma",
            Label::AtopicDermatitis => "Atopic Dermatitis",
            Label::BasalCellCarcinoma => "Basal Cell Carcinoma (BCC)",
            Label::MelanocyticNevi => "Melanocytic Nevi (NV)",
            Label::BenignKeratosis => "Benign Keratosis-like Lesions (BKL)",
            Label::PsoriasisLichenPlanus => {
                "Psoriasis pictures Lichen Planus and related diseases"
            }
            Label::SeborrheicKeratoses => "Seborrheic Keratoses and other Benign Tumors",
            Label::TineaRingworm => "Tinea Ringworm Candidiasis and other Fungal Infections",
        }
    }

    /// URL-safe identifier
    pub fn slug(self) -> &'static str {
        match self {
            Label::Eczema => "eczema",
            Label::WartsMolluscum => "warts-molluscum",
            Label::Melanoma => "melanoma",
            Label::AtopicDermatitis => "atopic-dermatitis",
            Label::BasalCellCarcinoma => "basal-cell-carcinoma",
            Label::MelanocyticNevi => "melanocytic-nevi",
            Label::BenignKeratosis => "benign-keratosis",
            Label::PsoriasisLichenPlanus => "psoriasis-lichen-planus",
            Label::SeborrheicKeratoses => "seborrheic-keratoses",
            Label::TineaRingworm => "tinea-ringworm",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Label {
    type Err = DetectionError;

    /// Accepts the display name (any case) or the slug
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Label::ALL
            .iter()
            .copied()
            .find(|label| label.slug() == wanted || label.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DetectionError::UnknownLabel(wanted.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionRecord {
    pub label: Label,
    pub description: &'static str,
    pub primary_treatment: &'static str,
    pub secondary_treatment: &'static str,
    pub contagious: bool,
}

/// Record for `label`
pub fn record(label: Label) -> &'static ConditionRecord {
    &CONDITIONS[label.index()]
}

/// Record by display name or slug
pub fn lookup(name: &str) -> DetectionResult<&'static ConditionRecord> {
    name.parse::<Label>().map(record)
}

/// Every record, in classifier order
pub fn all() -> &'static [ConditionRecord; LABEL_COUNT] {
    &CONDITIONS
}

static CONDITIONS: [ConditionRecord; LABEL_COUNT] = [
    ConditionRecord {
        label: Label::Eczema,
        description: "A condition that causes the skin to become itchy, red, dry and cracked. It's common in children but can occur at any age.",
        primary_treatment: "An effective, intensive treatment for severe eczema involves applying a corticosteroid ointment and sealing in the medication with a wrap of wet gauze topped with a layer of dry gauze.",
        secondary_treatment: "DUPIXENT® (dupilumab) is a prescription medicine used to treat people aged 6 years and older with moderate-to-severe atopic dermatitis (eczema) that is not well controlled with prescription therapies used on the skin (topical) or who cannot use topical therapies. Other treatments for eczema include azathioprine, cyclosporine, methotrexate, pimecrolimus, crisaborole, and tacrolimus, which are prescription creams and ointments that control inflammation and reduce immune system reactions. Calcineurin inhibitors, such as pimecrolimus and tacrolimus, are also recommended if OTC steroids don't work or cause problems. Corticosteroid creams, solutions, gels, foams, and ointments, made with hydrocortisone steroids, can quickly relieve itching and reduce inflammation. Pimecrolimus cream or tacrolimus ointment, also known as topical calcineurin inhibitors (TCIs), may be prescribed by a dermatologist.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::WartsMolluscum,
        description: "Viral skin infections characterized by small, raised bumps on the skin. Contagious and spread through direct contact.",
        primary_treatment: "Doctors recommend many topical treatments for molluscum contagiosum. Podophyllotoxin (contraindicated in pregnant women), potassium hydroxide, salicylic acid (associated or not with povidone-iodine), benzoyl peroxide, and tretinoin are used as home treatments and must be applied to each lesion.",
        secondary_treatment: "Cantharidin (beetle juice): This FDA-approved treatment is made from blister beetles. It's approved to treat adults and children two years of age and older. Dermatologists have been using cantharidin to treat warts and molluscum since the 1950s. When treating molluscum bumps, your dermatologist applies the beetle juice to each bump. Your dermatologist will apply it to each bump in such a way that a water blister later forms.",
        contagious: true,
    },
    ConditionRecord {
        label: Label::Melanoma,
        description: "The most serious type of skin cancer that develops from the pigment-producing cells known as melanocytes.",
        primary_treatment: "Treatment for early-stage melanomas usually includes surgery to remove the melanoma. A very thin melanoma may be removed entirely during the biopsy and require no further treatment. Otherwise, your surgeon will remove the cancer as well as a border of normal skin and a layer of tissue beneath the skin.",
        secondary_treatment: "Ipilimumab (Yervoy®) is an immunotherapy drug used to treat metastatic melanoma and stage III melanoma that cannot be removed completely with surgery. It works by blocking an immune molecule called CTLA-4. Checkpoint inhibitors, also known as immune checkpoint blockade, are commonly used to treat melanoma. Interferon alfa (Intron A, Roferon-A) can be used after surgery to prevent melanoma recurrence. Targeted therapy of melanoma includes vemurafenib, cobimetinib, dabrafenib, and trametinib, which attack cells that have a damaged BRAF gene. Targeted medicines for melanoma with NRAS and C-KIT mutations may be available through clinical trials.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::AtopicDermatitis,
        description: "A chronic, inflammatory skin disease associated with asthma and hay fever, commonly starting in childhood.",
        primary_treatment: "The main treatments for atopic eczema are: emollients (moisturisers) used every day to stop the skin becoming dry. topical corticosteroids creams and ointments used to reduce swelling and redness during flare-ups.",
        secondary_treatment: "DUPIXENT® (dupilumab) is a prescription medicine used to treat moderate-to-severe atopic dermatitis (eczema) that is not well controlled with prescription therapies used on the skin (topical), or who cannot use topical therapies. It is not known if DUPIXENT is safe and effective in children with atopic dermatitis under 6 years of age. Cibinqo (abrocitinib) is an oral JAK1 inhibitor approved by the FDA for adults with refractory moderate to severe atopic dermatitis whose disease is not adequately controlled with other systemic drug products, including biologics, or when use of those therapies is inadvisable. Immunosuppressants are prescribed for moderate to severe atopic dermatitis in children and adults to help stop the itch-scratch cycle of eczema, to allow the skin to heal and reduce the risk of skin infection. Topical calcineurin inhibitors, immunosuppressant tablets, and alitretinoin are some of the topical treatments for atopic dermatitis.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::BasalCellCarcinoma,
        description: "The most common form of skin cancer, usually caused by sun exposure.",
        primary_treatment: "The current mainstay of BCC treatment involves surgical modalities such as excision, electrodesiccation and curettage (EDC), cryosurgery, and Mohs micrographic surgery. Such methods are typically reserved for localized BCC and offer high 5-year cure rates, generally over 95%.",
        secondary_treatment: "Basal cell skin cancer does not usually respond to chemotherapy, but it often responds to a targeted drug called vismodegib, sold as Erivedge®, which helps disrupt the activity of a group of proteins in the body called hedgehog. Erivedge® (vismodegib) capsule is a prescription medicine used to treat adults with basal cell carcinoma that has spread to other parts of the body or that has come back after surgery or that cannot be treated with surgery or radiation. It is the #1 most-prescribed oral medication for advanced basal cell carcinoma.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::MelanocyticNevi,
        description: "Common moles that appear as small, dark brown spots caused by clusters of pigmented cells.",
        primary_treatment: "Small nevi can be removed by simple surgical excision. The nevus is cut out, and the adjacent skin stitched together leaving a small scar. Removal of a large congenital nevus, however, requires replacement of the affected skin.",
        secondary_treatment: "Melanocytic nevus is the medical term for a mole. Nevi can appear anywhere on the body. They are benign (non-cancerous) and typically do not require treatment. A very small percentage of melanocytic nevi may develop a melanoma within them. Of note, the majority of cutaneous melanomas arise within normally appearing skin.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::BenignKeratosis,
        description: "Non-cancerous growths that appear as waxy, scaly, slightly raised growths on the skin.",
        primary_treatment: "Cryosurgery: The dermatologist applies liquid nitrogen, a very cold liquid, to the growth with a cotton swab or spray gun. Electrosurgery and curettage: Electrosurgery (electrocautery) involves numbing the growth with an anesthetic and using an electric current to destroy the growth.",
        secondary_treatment: "A seborrheic keratosis is a growth on the skin. The growth is not cancer (benign). It's color can range from white, tan, brown, or black. Seborrheic keratoses often appear on a person's chest, arms, back, or other areas. They're very common in people older than age 50.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::PsoriasisLichenPlanus,
        description: "Inflammatory skin conditions characterized by scaly, itchy patches or bumps.",
        primary_treatment: "Lichen planus does not usually require treatment. It often goes away by itself within a year. If a person has particularly itchy or painful outbreaks, a doctor may prescribe topical corticosteroids or light therapy. Psoriasis is a long-term condition, but people can usually manage their symptoms well.",
        secondary_treatment: "There isn't a cure for lichen planus. If you have lichen planus on your skin, in most cases, it goes away without treatment in as little as a few months to several years. Corticosteroid creams or ointments. Your healthcare provider may prescribe corticosteroid creams or ointments to reduce inflammation. Phototherapy uses ultraviolet light, usually ultraviolet B (UVB), from special lamps. The ultraviolet light waves found in sunlight can help certain skin disorders, including lichen planus.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::SeborrheicKeratoses,
        description: "Common non-cancerous skin growths that begin in keratinocytes and appear as waxy, scaly patches.",
        primary_treatment: "Eskata, a 40% hydrogen peroxide topical solution, is the first FDA-approved drug for treatment of seborrheic keratoses. Administration of the drug may be tedious and usually requires at least two office visits.",
        secondary_treatment: "Ammonium lactate and alpha hydroxy acids have been reported to reduce the height of seborrheic keratoses, and superficial lesions can be treated by carefully applying pure trichloroacetic acid and repeating if the full thickness is not removed on the first treatment. Topical treatment with tazarotene cream 0.1% applied twice daily for 16 weeks caused clinical improvement in seborrheic keratoses in 7 of 15 patients. Diclofenac gel may be a new treatment option for seborrheic keratosis. Hydrogen peroxide 40% (Eskata) is a topical solution for the in-office treatment of raised seborrheic keratosis lesions.",
        contagious: false,
    },
    ConditionRecord {
        label: Label::TineaRingworm,
        description: "Fungal infections on the skin characterized by ring-shaped rashes. Highly contagious.",
        primary_treatment: "Typically, a course of antifungal creams (either prescription or over-the-counter) will clear up the rash and relieve the itchiness. Your healthcare provider can also discuss preventive steps to keep the rash from coming back.",
        secondary_treatment: "Tinea ringworm can be treated with over-the-counter (OTC) antifungal creams containing clotrimazole, ketoconazole, econazole, tolnaftate, or terbinafine. However, if there are many patchy areas, a prescription cream or oral antifungal medicine taken by mouth may be necessary.",
        contagious: true,
    },
];
