//! Announcement templates: literals, references, loops and conditionals
//! rendered against a [`DeliveryRun`].

use std::str::FromStr;

use crate::model::DeliveryRun;

/// Element tree types.
pub mod ast;
mod engine;
mod parser;
mod resolve;
/// Scope chain consulted while rendering.
pub mod scope;

pub use ast::{Element, ListName, Location};
pub use engine::Evaluated;
pub use scope::{Binding, Scope};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors raised while parsing or rendering a template.
pub enum TemplateError {
    /// Malformed template source.
    #[error("{location}: {message}")]
    Parse {
        /// Where the problem was found.
        location: Location,
        /// What was wrong.
        message: String,
    },
    /// `LOOP` over a collection that does not exist.
    #[error("{location}: unknown list '{name}'")]
    UnknownList {
        /// List name as written.
        name: String,
        /// Where the reference starts.
        location: Location,
    },
    /// A reference that is unknown or has no binding in scope.
    #[error("{location}: unknown variable '{name}'")]
    UnknownVariable {
        /// Reference name as written.
        name: String,
        /// Where the reference starts.
        location: Location,
    },
    /// A loop that needs an enclosing scope it does not have.
    #[error("{location}: LOOP over {list} needs an enclosing {needs} scope")]
    MissingScope {
        /// List iterated.
        list: String,
        /// Scope the list depends on.
        needs: &'static str,
        /// Where the `LOOP` starts.
        location: Location,
    },
}

impl TemplateError {
    pub(crate) fn parse<M: Into<String>>(location: Location, message: M) -> Self {
        TemplateError::Parse {
            location,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A parsed template, ready to render any number of times.
pub struct Template {
    elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Announcement rendered for one driver.
pub struct DriverMessage {
    /// Driver username.
    pub username: String,
    /// Rendered text.
    pub text: String,
}

impl Template {
    /// Parse template source.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Parse`] or [`TemplateError::UnknownList`] with
    /// the location of the first problem.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let elements = parser::parse(source)?;
        tracing::debug!(elements = elements.len(), "template parsed");
        Ok(Self { elements })
    }

    /// Top-level elements.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Render within an explicit scope.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownVariable`] for references that do not
    /// resolve and [`TemplateError::MissingScope`] for loops opened out of context.
    pub fn render(&self, scope: &Scope<'_>) -> Result<String, TemplateError> {
        engine::evaluate(&self.elements, scope).map(Evaluated::into_text)
    }

    /// Render once for the whole run.
    ///
    /// # Errors
    ///
    /// See [`Template::render`].
    pub fn render_run(&self, run: &DeliveryRun) -> Result<String, TemplateError> {
        self.render(&Scope::base(run))
    }

    /// Render once per driver, in file order.
    ///
    /// # Errors
    ///
    /// See [`Template::render`]; the first failing driver aborts.
    pub fn render_drivers(&self, run: &DeliveryRun) -> Result<Vec<DriverMessage>, TemplateError> {
        let base = Scope::base(run);
        run.drivers
            .iter()
            .map(|driver| {
                let scope = base.child("Driver", Binding::Driver(driver));
                Ok(DriverMessage {
                    username: driver.username.clone(),
                    text: self.render(&scope)?,
                })
            })
            .collect()
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Template::parse(source)
    }
}

/// Parse-free rendering of an already parsed template in `scope`.
///
/// # Errors
///
/// See [`Template::render`].
pub fn render(template: &Template, scope: &Scope<'_>) -> Result<String, TemplateError> {
    template.render(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{parse, read_grid};

    const HEADER: &str = "Consumer,Driver,Name,User Name,Phone,Alt. Phone,Neighborhood,City,Address,Condo,Details,Restaurants,normal,veggie,#orders";

    fn run() -> DeliveryRun {
        let rows = [
            HEADER,
            "FALSE,FALSE,ControlBegin,,,,,,,,,,,,",
            "FALSE,FALSE,Version,,,,,,,,2-0-0,,,,",
            "FALSE,FALSE,OpsManager,,,,,,,,\"ops, 555-0100\",,,,",
            "FALSE,FALSE,StartTimes,,,,,,,,\"5:00 PM, 5:15 PM\",,,,",
            "FALSE,FALSE,BackupDriver,,,,,,,,\"@spare, @extra\",,,,",
            "FALSE,FALSE,ControlEnd,,,,,,,,,,,,",
            ",,,,,,,,,,,,,,",
            "FALSE,TRUE,Driver Name,dname,555-0001,,,Berkeley,1 Main St,,,,,,",
            "FALSE,FALSE,,,,,,,,,,Kitchen,,,2",
            "TRUE,FALSE,Cust Name 5,c5,(510) 555-0005,,North,Berkeley,5 Elm St,TRUE,,Kitchen,1,0,",
            "TRUE,FALSE,Cust Name 6,c6,555-0006,555-0066,North,Berkeley,6 Elm St,FALSE,Ring twice,Kitchen,0,1,",
            "FALSE,TRUE,Driver Name,dname,555-0001,,,Berkeley,1 Main St,,,,,,",
            "https://www.google.com/maps/dir/a/b,,,,,,,,,,,,,,",
            ",,,,,,,,,,,,,,",
            "FALSE,TRUE,Other Driver,odriver,555-0002,555-0003,,Berkeley,2 Main St,,,,,,",
            "FALSE,FALSE,,,,,,,,,,Cafe,,,1",
            "TRUE,FALSE,Cust Name 7,c7,555-0007,,South,Berkeley,7 Elm St,,,Cafe,2,0,",
            "FALSE,TRUE,Other Driver,odriver,555-0002,,,Berkeley,2 Main St,,,,,,",
            "https://www.google.com/maps/dir/c/d,,,,,,,,,,,,,,",
        ];
        let grid = read_grid(rows.join("\n").as_bytes()).expect("csv");
        parse(&grid, None).expect("valid run")
    }

    fn render_run(source: &str) -> Result<String, TemplateError> {
        Template::parse(source)?.render_run(&run())
    }

    #[test]
    fn renders_condo_branches_per_consumer() {
        let run = run();
        let template = Template::parse(
            "LOOP &{Consumer} { &{Consumer.Name} \"|\" IF &{Consumer.IsCondo} THEN { \"Condo\" } IF NOT &{Consumer.IsCondo} THEN { \"NoCondo\" } \"\\n\" }",
        )
        .expect("valid template");
        let messages = template.render_drivers(&run).expect("rendered");
        assert_eq!(messages[0].username, "dname");
        assert_eq!(messages[0].text, "Cust Name 5|Condo\nCust Name 6|NoCondo\n");
        assert_eq!(messages[1].text, "Cust Name 7|NoCondo\n");
    }

    #[test]
    fn unknown_reference_names_itself_and_its_location() {
        let error = render_run("\"Hi \"\n  ${NotAReal Field}").expect_err("unknown");
        assert_eq!(
            error,
            TemplateError::UnknownVariable {
                name: "NotAReal Field".to_owned(),
                location: Location::new(2, 3),
            }
        );
    }

    #[test]
    fn driver_reference_outside_driver_scope_is_unknown() {
        let error = render_run("${Driver.Name}").expect_err("no driver in scope");
        assert!(matches!(error, TemplateError::UnknownVariable { .. }));
    }

    #[test]
    fn continue_skips_the_rest_of_the_iteration_only() {
        let output = render_run(
            "LOOP &{Driver} { LOOP &{Consumer} { IF NOT &{Consumer.IsAltPhone} THEN { CONTINUE } ${Consumer.UserName} \" \" } ${Driver.UserName} \";\" }",
        )
        .expect("rendered");
        assert_eq!(output, "c6 dname;odriver;");
    }

    #[test]
    fn nested_lists_and_generic_references() {
        let output = render_run(
            "LOOP &{Driver} { ${Driver.CompositeName} \" \" ${Driver.StartTime} \":\" LOOP &{ThisDriverRestaurant} { ${ThisDriverRestaurant.Name} \"(\" ${ThisDriverRestaurant.Orders} \")\" LOOP &{ThisDriverRestaurant.Pickup} { \" \" ${Consumer.CompactPhone} } } \"\\n\" }",
        )
        .expect("rendered");
        assert_eq!(
            output,
            "Driver Name (dname) 5:00 PM:Kitchen(2) 5105550005 5550006\nOther Driver (odriver) 5:15 PM:Cafe(1) 5550007\n"
        );
    }

    #[test]
    fn itinerary_and_control_lists() {
        let output = render_run(
            "${OpsManager.UserName} LOOP &{BackupDriver} { \" \" ${BackupDriver.UserName} } \"\\n\" LOOP &{Driver} { LOOP &{Itinerary} { IF &{Itinerary.IsRestaurant} THEN { \"R\" } IF &{Itinerary.IsDelivery} THEN { \"D\" } } \" \" ${Driver.TotalNormal} \"/\" ${Driver.TotalVeggie} \"\\n\" }",
        )
        .expect("rendered");
        assert_eq!(output, "ops spare extra\nRDD 1/1\nRD 2/0\n");
    }

    #[test]
    fn driver_list_without_driver_scope_is_rejected() {
        let error = render_run("LOOP &{Consumer} { }").expect_err("no driver");
        assert_eq!(error.to_string(), "1:1: LOOP over Consumer needs an enclosing Driver scope");
    }
}
