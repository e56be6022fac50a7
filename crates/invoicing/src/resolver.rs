//! Price/discount resolution for a single document line.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricedesk_core::{CompanyId, DomainError, DomainResult, ValueObject};
use pricedesk_currency::{Currency, CurrencyConverter};
use pricedesk_pricelists::{DiscountPolicy, Pricelist, PricelistEngine};
use pricedesk_products::Product;

/// Displayed unit price and discount percentage of a line.
///
/// `price_unit * (1 - discount / 100)` is the price the pricelist computed,
/// up to the rounding of `discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub price_unit: Decimal,
    pub discount: Decimal,
}

impl LinePricing {
    pub fn undiscounted(price_unit: Decimal) -> Self {
        Self {
            price_unit,
            discount: Decimal::ZERO,
        }
    }

    /// Unit price after discount.
    pub fn net_price_unit(&self) -> Decimal {
        self.price_unit * (Decimal::ONE - self.discount / Decimal::ONE_HUNDRED)
    }
}

impl ValueObject for LinePricing {}

/// Resolves line prices from a pricelist engine and a currency converter.
#[derive(Debug, Clone)]
pub struct PriceResolver<E, C> {
    engine: E,
    converter: C,
}

impl<E, C> PriceResolver<E, C>
where
    E: PricelistEngine,
    C: CurrencyConverter,
{
    pub fn new(engine: E, converter: C) -> Self {
        Self { engine, converter }
    }

    /// Price `quantity` units of `product` for a line in `line_currency`.
    ///
    /// All conversions use the rate valid for `company` on `date` (the
    /// document date), so re-resolving a historical document is stable.
    pub fn resolve(
        &self,
        product: &Product,
        quantity: Decimal,
        pricelist: &Pricelist,
        line_currency: &Currency,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<LinePricing> {
        let real = self
            .engine
            .get_price(product, quantity, pricelist, company, date)?;
        let price = self
            .converter
            .convert_rounded(real.price, &real.currency, line_currency, company, date)?;

        let pricing = match pricelist.discount_policy() {
            DiscountPolicy::WithDiscount => LinePricing::undiscounted(price),
            DiscountPolicy::WithoutDiscount => {
                let list_price = self.list_price(product, line_currency, company, date)?;
                if list_price.is_zero() {
                    LinePricing::undiscounted(price)
                } else {
                    let discount = list_price
                        .checked_sub(price)
                        .and_then(|d| d.checked_div(list_price))
                        .and_then(|d| d.checked_mul(Decimal::ONE_HUNDRED))
                        .ok_or_else(|| {
                            DomainError::validation(format!(
                                "discount of {price} against list price {list_price} overflows"
                            ))
                        })?;
                    LinePricing {
                        price_unit: list_price,
                        discount: pricelist.discount_precision().round(discount),
                    }
                }
            }
        };

        tracing::debug!(
            product = %product.id_typed(),
            pricelist = %pricelist.id_typed(),
            currency = %line_currency.code,
            %date,
            price_unit = %pricing.price_unit,
            discount = %pricing.discount,
            "line price resolved"
        );

        Ok(pricing)
    }

    /// Price of a line that has no pricelist: the list price, undiscounted.
    pub fn resolve_without_pricelist(
        &self,
        product: &Product,
        line_currency: &Currency,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<LinePricing> {
        let list_price = self.list_price(product, line_currency, company, date)?;
        Ok(LinePricing::undiscounted(list_price))
    }

    /// Product list price converted into `currency` and rounded to its precision.
    fn list_price(
        &self,
        product: &Product,
        currency: &Currency,
        company: CompanyId,
        date: NaiveDate,
    ) -> DomainResult<Decimal> {
        let product_currency = product.currency().ok_or_else(|| {
            DomainError::not_found(format!("product {}", product.id_typed()))
        })?;
        self.converter
            .convert_rounded(product.list_price(), product_currency, currency, company, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pricedesk_core::{Aggregate, AggregateId};
    use pricedesk_currency::{CurrencyCode, CurrencyRate, Precision, RateTable};
    use pricedesk_pricelists::{PricelistId, PricelistRule, RulePricelistEngine};
    use pricedesk_products::{CreateProduct, ProductCommand, ProductId};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    type Resolver = PriceResolver<RulePricelistEngine<RateTable>, RateTable>;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    fn usd() -> Currency {
        Currency::new(code("USD"), "US Dollar", Precision::CENTS)
    }

    fn eur() -> Currency {
        Currency::new(code("EUR"), "Euro", Precision::CENTS)
    }

    fn invoice_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn rates() -> RateTable {
        RateTable::new(code("EUR"))
            .with_rate(CurrencyRate::new(
                code("USD"),
                NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
                dec!(1.5289),
            ))
            .unwrap()
    }

    fn resolver() -> Resolver {
        PriceResolver::new(RulePricelistEngine::new(rates()), rates())
    }

    fn product(company: CompanyId, list_price: Decimal) -> Product {
        let id = ProductId::new(AggregateId::new());
        let mut product = Product::empty(id);
        product
            .execute(&ProductCommand::CreateProduct(CreateProduct {
                company_id: company,
                product_id: id,
                sku: "PT-1".to_string(),
                name: "Product Test".to_string(),
                list_price,
                currency: code("USD"),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        product
    }

    fn pricelist(currency: &str, policy: DiscountPolicy, rule: PricelistRule) -> Pricelist {
        Pricelist::new(
            PricelistId::new(AggregateId::new()),
            "Test Sale pricelist",
            code(currency),
            policy,
        )
            .unwrap()
            .with_rule(rule)
            .unwrap()
    }

    struct Case {
        pricelist_currency: &'static str,
        policy: DiscountPolicy,
        fixed: bool,
        line_currency: Currency,
        price_unit: Decimal,
        discount: Decimal,
    }

    fn run(case: Case) {
        let company = CompanyId::new();
        let p = product(company, dec!(100));
        let rule = if case.fixed {
            PricelistRule::fixed(p.id_typed(), dec!(60))
        } else {
            PricelistRule::percentage(p.id_typed(), dec!(10))
        };
        let pricelist = pricelist(case.pricelist_currency, case.policy, rule);

        let got = resolver()
            .resolve(&p, dec!(1), &pricelist, &case.line_currency, company, invoice_date())
            .unwrap();

        assert_eq!(got.price_unit, case.price_unit);
        assert_eq!(got.discount, case.discount);
    }

    #[test]
    fn fixed_price_shown_as_is() {
        run(Case {
            pricelist_currency: "USD",
            policy: DiscountPolicy::WithDiscount,
            fixed: true,
            line_currency: usd(),
            price_unit: dec!(60),
            discount: dec!(0),
        });
    }

    #[test]
    fn fixed_price_as_discount_off_list_price() {
        run(Case {
            pricelist_currency: "USD",
            policy: DiscountPolicy::WithoutDiscount,
            fixed: true,
            line_currency: usd(),
            price_unit: dec!(100),
            discount: dec!(40),
        });
    }

    #[test]
    fn percentage_shown_as_is() {
        run(Case {
            pricelist_currency: "USD",
            policy: DiscountPolicy::WithDiscount,
            fixed: false,
            line_currency: usd(),
            price_unit: dec!(90),
            discount: dec!(0),
        });
    }

    #[test]
    fn percentage_as_discount_off_list_price() {
        run(Case {
            pricelist_currency: "USD",
            policy: DiscountPolicy::WithoutDiscount,
            fixed: false,
            line_currency: usd(),
            price_unit: dec!(100),
            discount: dec!(10),
        });
    }

    #[test]
    fn percentage_in_secondary_currency_shown_as_is() {
        run(Case {
            pricelist_currency: "EUR",
            policy: DiscountPolicy::WithDiscount,
            fixed: false,
            line_currency: eur(),
            price_unit: dec!(58.87),
            discount: dec!(0),
        });
    }

    #[test]
    fn percentage_in_secondary_currency_as_discount() {
        run(Case {
            pricelist_currency: "EUR",
            policy: DiscountPolicy::WithoutDiscount,
            fixed: false,
            line_currency: eur(),
            price_unit: dec!(65.41),
            discount: dec!(10),
        });
    }

    #[test]
    fn fixed_in_secondary_currency_shown_as_is() {
        run(Case {
            pricelist_currency: "EUR",
            policy: DiscountPolicy::WithDiscount,
            fixed: true,
            line_currency: eur(),
            price_unit: dec!(60),
            discount: dec!(0),
        });
    }

    #[test]
    fn fixed_in_secondary_currency_as_discount() {
        run(Case {
            pricelist_currency: "EUR",
            policy: DiscountPolicy::WithoutDiscount,
            fixed: true,
            line_currency: eur(),
            price_unit: dec!(65.41),
            discount: dec!(8.27),
        });
    }

    #[test]
    fn pricelist_currency_is_converted_into_line_currency() {
        // EUR pricelist, USD line: 60 EUR * 1.5289 = 91.734 USD
        run(Case {
            pricelist_currency: "EUR",
            policy: DiscountPolicy::WithDiscount,
            fixed: true,
            line_currency: usd(),
            price_unit: dec!(91.73),
            discount: dec!(0),
        });
    }

    #[test]
    fn zero_list_price_never_divides() {
        let company = CompanyId::new();
        let p = product(company, Decimal::ZERO);

        for policy in [DiscountPolicy::WithDiscount, DiscountPolicy::WithoutDiscount] {
            let rule = PricelistRule::percentage(p.id_typed(), dec!(10));
            let pricelist = pricelist("USD", policy, rule);
            let got = resolver()
                .resolve(&p, dec!(1), &pricelist, &usd(), company, invoice_date())
                .unwrap();
            assert_eq!(got, LinePricing::undiscounted(Decimal::ZERO));
        }
    }

    #[test]
    fn zero_list_price_with_fixed_rule_shows_fixed_price() {
        let company = CompanyId::new();
        let p = product(company, Decimal::ZERO);
        let pricelist = pricelist(
            "USD",
            DiscountPolicy::WithoutDiscount,
            PricelistRule::fixed(p.id_typed(), dec!(60)),
        );

        let got = resolver()
            .resolve(&p, dec!(1), &pricelist, &usd(), company, invoice_date())
            .unwrap();
        assert_eq!(got, LinePricing::undiscounted(dec!(60)));
    }

    #[test]
    fn price_above_list_price_gives_negative_discount() {
        let company = CompanyId::new();
        let p = product(company, dec!(100));
        let pricelist = pricelist(
            "USD",
            DiscountPolicy::WithoutDiscount,
            PricelistRule::fixed(p.id_typed(), dec!(125)),
        );

        let got = resolver()
            .resolve(&p, dec!(1), &pricelist, &usd(), company, invoice_date())
            .unwrap();
        assert_eq!(got.price_unit, dec!(100));
        assert_eq!(got.discount, dec!(-25));
    }

    #[test]
    fn discount_overflow_is_an_error() {
        let company = CompanyId::new();
        let p = product(company, dec!(0.01));
        let huge = Decimal::from_i128_with_scale(10_i128.pow(27), 0);
        let pricelist = pricelist(
            "USD",
            DiscountPolicy::WithoutDiscount,
            PricelistRule::fixed(p.id_typed(), huge),
        );

        let err = resolver()
            .resolve(&p, dec!(1), &pricelist, &usd(), company, invoice_date())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn percentage_overflow_is_an_error() {
        let company = CompanyId::new();
        let p = product(company, Decimal::MAX);
        let pricelist = pricelist(
            "USD",
            DiscountPolicy::WithDiscount,
            PricelistRule::percentage(p.id_typed(), dec!(10)),
        );

        let err = resolver()
            .resolve(&p, dec!(1), &pricelist, &usd(), company, invoice_date())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn discount_precision_comes_from_the_pricelist() {
        let company = CompanyId::new();
        let p = product(company, dec!(100));
        let pricelist = pricelist(
            "EUR",
            DiscountPolicy::WithoutDiscount,
            PricelistRule::fixed(p.id_typed(), dec!(60)),
        )
        .with_discount_precision(Precision::new(4).unwrap());

        let got = resolver()
            .resolve(&p, dec!(1), &pricelist, &eur(), company, invoice_date())
            .unwrap();
        assert_eq!(got.discount, dec!(8.2709));
    }

    #[test]
    fn invoice_date_before_any_rate_is_a_configuration_error() {
        let company = CompanyId::new();
        let p = product(company, dec!(100));
        let pricelist = pricelist(
            "EUR",
            DiscountPolicy::WithDiscount,
            PricelistRule::percentage(p.id_typed(), dec!(10)),
        );

        let before_rates = NaiveDate::from_ymd_opt(2009, 6, 1).unwrap();

        let err = resolver()
            .resolve(&p, dec!(1), &pricelist, &eur(), company, before_rates)
            .unwrap_err();
        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn non_positive_quantity_is_rejected_by_the_engine() {
        let company = CompanyId::new();
        let p = product(company, dec!(100));
        let pricelist = pricelist(
            "USD",
            DiscountPolicy::WithDiscount,
            PricelistRule::fixed(p.id_typed(), dec!(60)),
        );

        let err = resolver()
            .resolve(&p, Decimal::ZERO, &pricelist, &usd(), company, invoice_date())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn without_pricelist_the_converted_list_price_is_used() {
        let company = CompanyId::new();
        let p = product(company, dec!(100));
        let got = resolver()
            .resolve_without_pricelist(&p, &eur(), company, invoice_date())
            .unwrap();
        assert_eq!(got, LinePricing::undiscounted(dec!(65.41)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the displayed price and discount reproduce the computed price.
        #[test]
        fn displayed_price_reproduces_computed_price(
            list_cents in 1i64..10_000_000i64,
            fixed_cents in 0i64..10_000_000i64,
        ) {
            let company = CompanyId::new();
            let p = product(company, Decimal::new(list_cents, 2));
            let fixed = Decimal::new(fixed_cents, 2);
            let pricelist = pricelist(
                "USD",
                DiscountPolicy::WithoutDiscount,
                PricelistRule::fixed(p.id_typed(), fixed),
            );

            let got = resolver()
                .resolve(&p, dec!(1), &pricelist, &usd(), company, invoice_date())
                .unwrap();

            // A discount rounded to 0.01% moves the net price by at most
            // 0.005% of the list price.
            let tolerance = got.price_unit * dec!(0.00005) + dec!(0.005);
            prop_assert!((got.net_price_unit() - fixed).abs() <= tolerance);
        }

        /// Property: resolving twice with the same snapshot gives the same answer.
        #[test]
        fn resolution_is_idempotent(
            list_cents in 0i64..10_000_000i64,
            percent in 0i64..100i64,
            without_discount in any::<bool>(),
        ) {
            let company = CompanyId::new();
            let p = product(company, Decimal::new(list_cents, 2));
            let policy = if without_discount {
                DiscountPolicy::WithoutDiscount
            } else {
                DiscountPolicy::WithDiscount
            };
            let rule = PricelistRule::percentage(p.id_typed(), Decimal::from(percent));
            let pricelist = pricelist("EUR", policy, rule);
            let resolver = resolver();
            let date = invoice_date();

            let first = resolver.resolve(&p, dec!(2), &pricelist, &eur(), company, date).unwrap();
            let second = resolver.resolve(&p, dec!(2), &pricelist, &eur(), company, date).unwrap();

            prop_assert_eq!(first, second);
        }
    }
}
