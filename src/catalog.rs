//! Static credit card catalog and the terms page.
//!
//! The catalog is browsing material only; it is not indexed and the query
//! pipeline never reads it.

use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Card {
    pub bank: &'static str,
    pub name: &'static str,
    pub image_url: &'static str,
    pub features: &'static [Feature],
}

const PREMIUM_CASHBACK: &[Feature] = &[
    Feature {
        title: "High Cashback Rates",
        description: "Earn up to 5% cashback on eligible spending categories such as dining, online shopping, and travel, making it ideal for frequent spenders.",
    },
    Feature {
        title: "Exclusive Offers",
        description: "Access to exclusive promotions and discounts at various merchants, enhancing the overall value of the card.",
    },
    Feature {
        title: "Flexible Redemption Options",
        description: "Enjoy flexible redemption options for cashback, allowing cardholders to use their rewards for statement credits or other benefits.",
    },
];

const TRAVEL_MILES: &[Feature] = &[
    Feature {
        title: "Travel Rewards",
        description: "Earn 2 miles for every HKD 1 spent on overseas transactions and 1 mile for every HKD 1 spent locally, perfect for travelers looking to accumulate miles for flights and upgrades.",
    },
    Feature {
        title: "Comprehensive Travel Insurance",
        description: "Enjoy complimentary travel insurance coverage for trips booked with the card, providing peace of mind while traveling.",
    },
    Feature {
        title: "Airport Lounge Access",
        description: "Complimentary access to airport lounges, enhancing the travel experience with comfort and convenience.",
    },
];

const EVERYDAY_NO_FEE: &[Feature] = &[
    Feature {
        title: "No Annual Fee",
        description: "The card comes with no annual fee, making it a cost-effective option for users who want to enjoy rewards without incurring extra charges.",
    },
    Feature {
        title: "Cashback on Everyday Spending",
        description: "Earn 1% cashback on all local spending, making it a great choice for everyday expenses and purchases.",
    },
    Feature {
        title: "Instant Discounts",
        description: "Access to instant discounts and promotions at various merchants, providing additional savings on purchases.",
    },
];

pub const CARDS: &[Card] = &[
    Card {
        bank: "HSBC",
        name: "HSBC Premier Mastercard",
        image_url: "https://www.hsbc.com.hk/content/dam/hsbc/hk/images/mass/credit-cards/tile-16-9/14524-hsbc-premier-credit-card-white-bg-1600x900.jpg/jcr:content/renditions/cq5dam.web.1220.1000.jpeg",
        features: &[
            Feature {
                title: "Exclusive Rewards",
                description: "Earn 2.5% cashback on overseas spending and 1% on local spending, making it ideal for frequent travelers and shoppers.",
            },
            Feature {
                title: "Travel Benefits",
                description: "Enjoy complimentary travel insurance, access to airport lounges, and special offers on travel bookings, enhancing your travel experience.",
            },
            Feature {
                title: "Flexible Payment Options",
                description: "Offers flexible repayment plans and the ability to convert large purchases into manageable installments.",
            },
        ],
    },
    Card {
        bank: "HSBC",
        name: "HSBC EveryMile Credit Card",
        image_url: "https://www.hsbc.com.hk/content/dam/hsbc/hk/images/mass/credit-cards/tile-16-9/8520-everymile-card-sky-grey-1600x900.jpg/jcr:content/renditions/cq5dam.web.1220.1000.jpeg",
        features: &[
            Feature {
                title: "Mile Accumulation",
                description: "Earn 1.5 miles for every HKD 1 spent locally and 2 miles for every HKD 1 spent overseas, perfect for those who travel frequently and want to accumulate miles quickly.",
            },
            Feature {
                title: "Bonus Miles",
                description: "Receive bonus miles upon reaching spending thresholds, allowing cardholders to redeem flights and travel rewards faster.",
            },
            Feature {
                title: "No Expiry on Miles",
                description: "Miles earned do not expire, providing flexibility in redeeming rewards without the pressure of time constraints.",
            },
        ],
    },
    Card {
        bank: "HSBC",
        name: "HSBC Red Credit Card",
        image_url: "https://www.hsbc.com.hk/content/dam/hsbc/hk/images/mass/credit-cards/tile-16-9/9358-hsbc-red-credit-card-grey-1600x900.jpg/jcr:content/renditions/cq5dam.web.1220.1000.jpeg",
        features: &[
            Feature {
                title: "Cashback Rewards",
                description: "Enjoy 1.5% cashback on all local spending and 2% on online purchases, making it a great choice for everyday expenses and online shopping.",
            },
            Feature {
                title: "No Annual Fee",
                description: "The card comes with no annual fee, making it cost-effective for users who want to maximize rewards without incurring extra charges.",
            },
            Feature {
                title: "Instant Discounts",
                description: "Access to exclusive discounts and promotions at various merchants, enhancing the overall value of the card.",
            },
        ],
    },
    Card {
        bank: "Hang Seng Bank",
        name: "Hang Seng MMPOWER World Mastercard",
        image_url: "https://www.hangseng.com/content/wpb/hase/en_hk/personal/cards/products/mmpower-card/_jcr_content/Content/rwd_container_v2/rwd_container_v2_2025653655/rwd_container_v2_cop/rwd_container_v2/rwd_image_copy_15411.img.jpg/1703731107121.jpg",
        features: PREMIUM_CASHBACK,
    },
    Card {
        bank: "Hang Seng Bank",
        name: "Hang Seng Travel+ Visa Signature Card",
        image_url: "https://photos-hk.cdn-moneysmart.com/credit_cards/uploads/products/images/image_url_2024-06-04_listing_image_url_2024-05-20_Screenshot%202024-05-20%20at%205.57.25%20PM.png",
        features: TRAVEL_MILES,
    },
    Card {
        bank: "Hang Seng Bank",
        name: "Hang Seng Enjoy Card",
        image_url: "https://www.yuurewards.com/sites/default/files/2022-03/enJoy%20Partner%20logo_20220301.jpg",
        features: EVERYDAY_NO_FEE,
    },
    Card {
        bank: "Citibank",
        name: "Citi Prestige Card",
        image_url: "https://www.citibank.com.hk/english/credit-cards/images/cards/filter/Prestige-Card-New.png",
        features: PREMIUM_CASHBACK,
    },
    Card {
        bank: "Citibank",
        name: "Citi PremierMiles Card",
        image_url: "https://www.citibank.com.hk/english/credit-cards/images/cards/filter/premier-miles-card.png",
        features: TRAVEL_MILES,
    },
    Card {
        bank: "Citibank",
        name: "Citi Cash Back Card",
        image_url: "https://www.citibank.com.hk/english/credit-cards/images/cards/filter/cashbackface-175x110.jpg",
        features: EVERYDAY_NO_FEE,
    },
    Card {
        bank: "Bank of China",
        name: "BOC Cheers Card",
        image_url: "https://www.bochk.com/dam/boccreditcard/cardproductlisting/images/layout/credit-card/cardType_251.png",
        features: PREMIUM_CASHBACK,
    },
    Card {
        bank: "Bank of China",
        name: "BOC Chill Card",
        image_url: "https://www.bochk.com/dam/boccreditcard/cardproductlisting/images/layout/credit-card/cardType_221.png",
        features: TRAVEL_MILES,
    },
    Card {
        bank: "Bank of China",
        name: "BOC Dual Currency Card",
        image_url: "https://www.bochk.com/dam/boccreditcard/cardproductlisting/images/layout/credit-card/cardType_195.png",
        features: EVERYDAY_NO_FEE,
    },
];

pub const TERMS: &str = "\
Terms of Use:
  - These terms and conditions govern your use of this application.
  - By using this app, you accept these terms in full.

Disclaimer:
  - The information provided in this application is for general informational purposes only.
  - The content is not intended to be legal advice. Please consult with a professional for advice specific to your situation.

Powered by: Azure OpenAI, Pinecone.";

/// Cards whose bank name contains `bank` (case-insensitive); all cards when `None`.
pub fn cards(bank: Option<&str>) -> Vec<&'static Card> {
    let needle = bank.map(|b| b.trim().to_lowercase());
    CARDS
        .iter()
        .filter(|card| match &needle {
            Some(n) => card.bank.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .collect()
}

/// Distinct bank names in catalog order.
pub fn banks() -> Vec<&'static str> {
    let mut banks: Vec<&'static str> = Vec::new();
    for card in CARDS {
        if !banks.contains(&card.bank) {
            banks.push(card.bank);
        }
    }
    banks
}

pub fn run_cards(bank: Option<&str>, json: bool) -> Result<()> {
    let selected = cards(bank);

    if json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    if selected.is_empty() {
        println!("No cards.");
        return Ok(());
    }

    let mut current_bank = "";
    for card in selected {
        if card.bank != current_bank {
            current_bank = card.bank;
            println!("{} Credit Cards", current_bank);
            println!("{}", "=".repeat(current_bank.len() + 13));
        }
        println!("  {}", card.name);
        for feature in card.features {
            println!("    - {}: {}", feature.title, feature.description);
        }
        println!();
    }

    Ok(())
}

pub fn run_terms() {
    println!("{}", TERMS);
}
