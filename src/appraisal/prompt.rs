//! Appraisal prompt construction.

use crate::models::ListingItem;

/// Share of the resale price lost to selling fees and shipping.
pub const SELLING_FEE_RATE: f64 = 0.15;

/// Acquisition cost (buyer fees, shipping) as a share of the listing price.
pub const ACQUISITION_FEE_RATE: f64 = 0.15;

/// Cards under this value are treated as bulk.
const VALUE_THRESHOLD: u32 = 20;

/// Estimated cost of acquiring the lot beyond its price.
pub fn acquisition_fee_estimate(price: f64) -> f64 {
    price * ACQUISITION_FEE_RATE
}

/// Total resale value at which net profit is zero.
///
/// Net profit is `value * (1 - SELLING_FEE_RATE) - price - acquisition fee`.
pub fn break_even_value(price: f64) -> f64 {
    (price + acquisition_fee_estimate(price)) / (1.0 - SELLING_FEE_RATE)
}

/// Build the appraisal prompt for one listing.
pub fn build_prompt(item: &ListingItem, image_count: usize) -> String {
    let price = item.price;
    let keep_rate = 1.0 - SELLING_FEE_RATE;
    let acquisition = acquisition_fee_estimate(price);
    let break_even = break_even_value(price);

    format!(
        r#"You are a professional card trader appraising the listing "{title}" at ${price}.

You are given {image_count} images of the lot. Your goal is to maximize resale profit.

1. HIGH-VALUE CARDS (${threshold}+ only):
   - Player or character, year, set, card number, parallel or insert
   - Recent SOLD prices, not asking prices
   - Condition (PSA 10/9/8 equivalent, or raw NM/LP/MP)
   - Ignore bulk cards below ${threshold}

2. PROFIT:
   - Total estimated value (conservative, assume one grade lower than it looks)
   - Listing price: ${price}
   - Acquisition fees and shipping: about ${acquisition:.2}
   - Selling fees and shipping: about {fee_pct:.0}% of sales
   - NET PROFIT = (Total Value x {keep_rate:.2}) - ${price} - ${acquisition:.2}
   - Break-even total value: ${break_even:.2}

3. RED FLAGS:
   - Counterfeit indicators (centering, print quality, holo pattern)
   - Water damage, creases, heavy edge wear
   - Overgraded condition claims
   - Hard-to-move inventory
   - Signs the lot was already picked over

4. RECOMMENDATION (choose exactly one):
   - STRONG BUY: profit over $100, low risk, fast sale
   - BUY: profit $50-100, moderate risk
   - MAYBE: profit $20-50, or high risk or slow sale
   - PASS: profit under $20, or too risky
   - STRONG PASS: certain loss or likely scam

5. ACTION PLAN (BUY or STRONG BUY only): cards to grade, flip or hold,
   where to sell, maximum bid.

RESPONSE FORMAT:
First line: "[RECOMMENDATION]: $XX profit expected"
Include a line starting with "Total Estimated Value:".
Then the detailed breakdown. Be strict about condition and selling difficulty."#,
        title = item.title,
        price = price,
        image_count = image_count,
        threshold = VALUE_THRESHOLD,
        acquisition = acquisition,
        fee_pct = SELLING_FEE_RATE * 100.0,
        keep_rate = keep_rate,
        break_even = break_even,
    )
}
