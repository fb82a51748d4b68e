//! Loan contracts and their time-value math.
//!
//! A contract is worth its principal at its origin timestamp and grows
//! from there, either at discrete compounding ticks or continuously. All
//! valuation functions take a *duration*: a non-negative offset from the
//! contract's own timestamp. Callers dealing in absolute times subtract
//! the timestamp first.

use crate::error::ContractError;
use crate::tolerance::default_tolerance;

/// How interest is applied over time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Compounding {
    /// Interest is applied `n` times per unit time; the value function is
    /// a step function with jumps at `timestamp + k/n`.
    Periodic(f64),
    /// The limit of infinitely many periods: smooth exponential growth.
    Continuous,
}

/// A named loan contract.
#[derive(Clone, Debug, PartialEq)]
pub struct Contract {
    name: String,
    principal: f64,
    interest_rate: f64,
    compounding: Compounding,
    timestamp: f64,
}

impl Contract {
    /// Create a contract compounding `periods` times per unit time.
    pub fn periodic(
        name: &str,
        principal: f64,
        interest_rate: f64,
        periods: f64,
        timestamp: f64,
    ) -> Result<Contract, ContractError> {
        if !periods.is_finite() || periods <= 0.0 {
            return Err(ContractError::InvalidCompoundingPeriods(periods));
        }
        Contract::checked(
            name,
            principal,
            interest_rate,
            Compounding::Periodic(periods),
            timestamp,
        )
    }

    /// Create a continuously compounding contract.
    pub fn continuous(
        name: &str,
        principal: f64,
        interest_rate: f64,
        timestamp: f64,
    ) -> Result<Contract, ContractError> {
        Contract::checked(
            name,
            principal,
            interest_rate,
            Compounding::Continuous,
            timestamp,
        )
    }

    /// Start building a contract fluently.
    pub fn builder(name: &str) -> ContractBuilder {
        ContractBuilder::new(name)
    }

    fn checked(
        name: &str,
        principal: f64,
        interest_rate: f64,
        compounding: Compounding,
        timestamp: f64,
    ) -> Result<Contract, ContractError> {
        if !principal.is_finite() || principal < 0.0 {
            return Err(ContractError::InvalidPrincipal(principal));
        }
        if !interest_rate.is_finite() || interest_rate < 0.0 {
            return Err(ContractError::InvalidInterestRate(interest_rate));
        }
        if !timestamp.is_finite() {
            return Err(ContractError::InvalidTimestamp(timestamp));
        }
        Ok(Contract {
            name: name.to_string(),
            principal,
            interest_rate,
            compounding,
            timestamp,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn interest_rate(&self) -> f64 {
        self.interest_rate
    }

    pub fn compounding(&self) -> Compounding {
        self.compounding
    }

    /// The number of compounding periods per unit time, `+∞` for
    /// continuous contracts.
    pub fn compounding_periods(&self) -> f64 {
        match self.compounding {
            Compounding::Periodic(periods) => periods,
            Compounding::Continuous => f64::INFINITY,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self.compounding, Compounding::Continuous)
    }

    /// The value of the contract `duration` after its origin.
    ///
    /// Periodic contracts are worth `principal * (1 + r/n)^⌊n*d⌋`,
    /// continuous ones `principal * e^(r*d)`.
    pub fn value_at(&self, duration: f64) -> Result<f64, ContractError> {
        Ok(self.principal * self.growth_factor(duration)?)
    }

    /// The multiplicative growth over `duration`, independent of the
    /// principal.
    pub fn growth_factor(&self, duration: f64) -> Result<f64, ContractError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(ContractError::InvalidDuration(duration));
        }
        let factor = match self.compounding {
            Compounding::Periodic(periods) => {
                let ticks = (periods * duration).floor();
                (1.0 + self.interest_rate / periods).powf(ticks)
            }
            Compounding::Continuous => (self.interest_rate * duration).exp(),
        };
        Ok(factor)
    }

    /// How far `duration` lands past the previous compounding tick,
    /// measured in ticks: the fractional part of `n*d`.
    ///
    /// Subtracting this from the contract's timestamp aligns a tick with
    /// the moment `duration` after the shifted origin, which lets values
    /// before and after that moment compose multiplicatively. Continuous
    /// contracts need no correction.
    pub fn shift_correction(&self, duration: f64) -> f64 {
        match self.compounding {
            Compounding::Periodic(periods) => (periods * duration).fract(),
            Compounding::Continuous => 0.0,
        }
    }

    /// A copy of the contract with its origin shifted back so that a
    /// compounding tick falls exactly on `payment_time`.
    pub(crate) fn aligned_at(&self, payment_time: f64) -> Contract {
        let mut aligned = self.clone();
        aligned.timestamp -= self.shift_correction(payment_time - self.timestamp);
        aligned
    }

    /// A new contract representing this one after forgiving `cut` at
    /// `absolute_time`: same rate and compounding, origin moved to
    /// `absolute_time`, principal set to the accrued value minus the cut.
    pub fn apply_debt_cut(&self, cut: f64, absolute_time: f64) -> Result<Contract, ContractError> {
        let value = self.value_at(absolute_time - self.timestamp)?;
        if !cut.is_finite() || cut < 0.0 || cut > value + default_tolerance() {
            return Err(ContractError::InvalidCut { cut, value });
        }
        let principal = (value - cut).max(0.0);
        Contract::checked(
            &self.name,
            principal,
            self.interest_rate,
            self.compounding,
            absolute_time,
        )
    }

    /// Compare the four numeric attributes within `tolerance`. Names are
    /// not part of the comparison.
    pub fn approx_eq(&self, other: &Contract, tolerance: f64) -> bool {
        let periods_match = match (self.compounding, other.compounding) {
            (Compounding::Periodic(a), Compounding::Periodic(b)) => (a - b).abs() <= tolerance,
            (Compounding::Continuous, Compounding::Continuous) => true,
            _ => false,
        };
        periods_match
            && (self.principal - other.principal).abs() <= tolerance
            && (self.interest_rate - other.interest_rate).abs() <= tolerance
            && (self.timestamp - other.timestamp).abs() <= tolerance
    }
}

/// Fluent construction of a [`Contract`]; validation happens in `build`.
#[derive(Clone, Debug)]
pub struct ContractBuilder {
    name: String,
    principal: f64,
    interest_rate: f64,
    compounding: Compounding,
    timestamp: f64,
}

impl ContractBuilder {
    pub fn new(name: &str) -> ContractBuilder {
        ContractBuilder {
            name: name.to_string(),
            principal: 0.0,
            interest_rate: 0.0,
            compounding: Compounding::Continuous,
            timestamp: 0.0,
        }
    }

    pub fn principal(mut self, principal: f64) -> Self {
        self.principal = principal;
        self
    }

    pub fn interest_rate(mut self, interest_rate: f64) -> Self {
        self.interest_rate = interest_rate;
        self
    }

    pub fn compounding_periods(mut self, periods: f64) -> Self {
        self.compounding = Compounding::Periodic(periods);
        self
    }

    pub fn continuous(mut self) -> Self {
        self.compounding = Compounding::Continuous;
        self
    }

    pub fn timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn build(self) -> Result<Contract, ContractError> {
        match self.compounding {
            Compounding::Periodic(periods) => Contract::periodic(
                &self.name,
                self.principal,
                self.interest_rate,
                periods,
                self.timestamp,
            ),
            Compounding::Continuous => Contract::continuous(
                &self.name,
                self.principal,
                self.interest_rate,
                self.timestamp,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_continuous_value() {
        let contract = Contract::continuous("c", 10.0, 0.15, 3.0).expect("test");
        assert_abs_diff_eq!(contract.value_at(0.0).expect("test"), 10.0);
        assert_abs_diff_eq!(
            contract.value_at(2.0).expect("test"),
            10.0 * (0.3f64).exp(),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            contract.growth_factor(2.0).expect("test"),
            (0.3f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_periodic_value_is_a_step_function() {
        let contract = Contract::periodic("k", 2.0, 0.1, 3.0, -1.0).expect("test");
        let per_tick = 1.0 + 0.1 / 3.0;

        // No tick before 1/3 of a unit has passed.
        assert_abs_diff_eq!(contract.value_at(0.0).expect("test"), 2.0);
        assert_abs_diff_eq!(contract.value_at(0.3).expect("test"), 2.0);
        // One tick at exactly 1/3... and still one tick at 0.5.
        assert_abs_diff_eq!(
            contract.value_at(0.5).expect("test"),
            2.0 * per_tick,
            epsilon = 1e-12
        );
        // 3.5 units hold 10 full ticks.
        assert_abs_diff_eq!(
            contract.value_at(3.5).expect("test"),
            2.0 * per_tick.powi(10),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_value_is_monotone_for_non_negative_rate() {
        let contract = Contract::periodic("k", 5.0, 0.2, 4.0, 0.0).expect("test");
        let mut previous = 0.0;
        for step in 0..100 {
            let value = contract.value_at(step as f64 * 0.13).expect("test");
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn test_invalid_durations_are_rejected() {
        let contract = Contract::continuous("c", 1.0, 0.1, 0.0).expect("test");
        assert!(matches!(
            contract.value_at(-0.5),
            Err(ContractError::InvalidDuration(_))
        ));
        assert!(matches!(
            contract.growth_factor(f64::NAN),
            Err(ContractError::InvalidDuration(_))
        ));
        assert!(matches!(
            contract.growth_factor(f64::INFINITY),
            Err(ContractError::InvalidDuration(_))
        ));
    }

    #[test]
    fn test_attribute_validation() {
        assert!(matches!(
            Contract::continuous("c", -1.0, 0.1, 0.0),
            Err(ContractError::InvalidPrincipal(_))
        ));
        assert!(matches!(
            Contract::continuous("c", 1.0, -0.1, 0.0),
            Err(ContractError::InvalidInterestRate(_))
        ));
        assert!(matches!(
            Contract::periodic("c", 1.0, 0.1, 0.0, 0.0),
            Err(ContractError::InvalidCompoundingPeriods(_))
        ));
        assert!(matches!(
            Contract::periodic("c", 1.0, 0.1, f64::INFINITY, 0.0),
            Err(ContractError::InvalidCompoundingPeriods(_))
        ));
        assert!(matches!(
            Contract::continuous("c", 1.0, 0.1, f64::NAN),
            Err(ContractError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_shift_correction_aligns_a_tick() {
        let contract = Contract::periodic("k", 2.0, 0.1, 3.0, -1.0).expect("test");
        // Payment at 2.5, i.e. 3.5 units after the origin: 10.5 ticks.
        assert_abs_diff_eq!(contract.shift_correction(3.5), 0.5, epsilon = 1e-12);

        let aligned = contract.aligned_at(2.5);
        let ticks = aligned.compounding_periods() * (2.5 - aligned.timestamp());
        assert_abs_diff_eq!(ticks, 12.0, epsilon = 1e-9);

        // Continuous contracts never shift.
        let contract = Contract::continuous("c", 1.0, 0.1, 0.0).expect("test");
        assert_abs_diff_eq!(contract.shift_correction(3.7), 0.0);
        assert_abs_diff_eq!(contract.aligned_at(3.7).timestamp(), 0.0);
    }

    #[test]
    fn test_aligned_values_compose_across_the_payment() {
        let contract = Contract::periodic("k", 2.0, 0.1, 3.0, -1.0).expect("test");
        let aligned = contract.aligned_at(2.5);

        let at_payment = aligned.value_at(2.5 - aligned.timestamp()).expect("test");
        let growth = aligned.growth_factor(5.0 - 2.5).expect("test");
        let direct = aligned.value_at(5.0 - aligned.timestamp()).expect("test");
        assert_abs_diff_eq!(at_payment * growth, direct, epsilon = 1e-9);
    }

    #[test]
    fn test_apply_debt_cut() {
        let contract = Contract::continuous("c", 10.0, 0.15, 3.0).expect("test");
        let value = contract.value_at(2.0).expect("test");

        let cut = contract.apply_debt_cut(4.0, 5.0).expect("test");
        assert_abs_diff_eq!(cut.principal(), value - 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cut.timestamp(), 5.0);
        assert_abs_diff_eq!(cut.interest_rate(), 0.15);
        assert!(cut.is_continuous());

        // Cutting the full value leaves a worthless contract.
        let emptied = contract.apply_debt_cut(value, 5.0).expect("test");
        assert_abs_diff_eq!(emptied.principal(), 0.0);

        assert!(matches!(
            contract.apply_debt_cut(value + 1.0, 5.0),
            Err(ContractError::InvalidCut { .. })
        ));
        assert!(matches!(
            contract.apply_debt_cut(-1.0, 5.0),
            Err(ContractError::InvalidCut { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let contract = Contract::builder("k")
            .principal(2.0)
            .interest_rate(0.1)
            .compounding_periods(3.0)
            .timestamp(-1.0)
            .build()
            .expect("test");
        assert_eq!(contract.compounding(), Compounding::Periodic(3.0));

        let reference = Contract::periodic("k", 2.0, 0.1, 3.0, -1.0).expect("test");
        assert!(contract.approx_eq(&reference, 1e-9));

        assert!(Contract::builder("bad").principal(-3.0).build().is_err());
    }

    #[test]
    fn test_approx_eq_compares_attributes_only() {
        let a = Contract::continuous("a", 1.0, 0.1, 0.0).expect("test");
        let b = Contract::continuous("b", 1.0004, 0.1, 0.0).expect("test");
        let c = Contract::periodic("a", 1.0, 0.1, 12.0, 0.0).expect("test");
        assert!(a.approx_eq(&b, 1e-3));
        assert!(!a.approx_eq(&b, 1e-6));
        assert!(!a.approx_eq(&c, 1e-3));
    }
}
