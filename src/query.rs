use crate::util::quote_plus;

/// Characters left unescaped in constraint and server-side function segments.
const EXPRESSION_SAFE: &str = "=!()/";

/// Arguments accepted by the server-side function wrappers.
///
/// A single string is used verbatim; a sequence is joined with commas.
pub trait ArgumentList {
    fn to_argument_list(&self) -> String;
}

impl ArgumentList for str {
    fn to_argument_list(&self) -> String {
        self.to_string()
    }
}

impl ArgumentList for String {
    fn to_argument_list(&self) -> String {
        self.clone()
    }
}

impl<S: AsRef<str>> ArgumentList for [S] {
    fn to_argument_list(&self) -> String {
        self.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
    }
}

impl<S: AsRef<str>, const N: usize> ArgumentList for [S; N] {
    fn to_argument_list(&self) -> String {
        self.as_slice().to_argument_list()
    }
}

impl<S: AsRef<str>> ArgumentList for Vec<S> {
    fn to_argument_list(&self) -> String {
        self.as_slice().to_argument_list()
    }
}

impl<T: ArgumentList + ?Sized> ArgumentList for &T {
    fn to_argument_list(&self) -> String {
        (**self).to_argument_list()
    }
}

/// Accumulated request specification of a dataset handle.
///
/// Order is significant everywhere: the server evaluates constraints and
/// functions in the order they appear in the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    result_variables: Vec<String>,
    constraints: Vec<String>,
    server_side_functions: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the result variables. An empty list requests every variable.
    pub fn set_result_variables<I, S>(&mut self, variables: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.result_variables = variables.into_iter().map(Into::into).collect();
    }

    /// Appends a constraint such as `time>=2020-12-24T00:00:00Z`. Not validated.
    pub fn add_constraint(&mut self, constraint: impl Into<String>) {
        self.constraints.push(constraint.into());
    }

    /// Appends `name("arg1,arg2")`.
    pub fn add_server_side_function<A: ArgumentList>(&mut self, name: &str, arguments: A) {
        self.push_function(format!("{}(\"{}\")", name, arguments.to_argument_list()));
    }

    /// Appends an already formatted function call verbatim.
    pub fn push_function(&mut self, call: impl Into<String>) {
        self.server_side_functions.push(call.into());
    }

    pub fn clear(&mut self) {
        self.result_variables.clear();
        self.constraints.clear();
        self.server_side_functions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.result_variables.is_empty()
            && self.constraints.is_empty()
            && self.server_side_functions.is_empty()
    }

    pub fn result_variables(&self) -> &[String] {
        &self.result_variables
    }

    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    pub fn server_side_functions(&self) -> &[String] {
        &self.server_side_functions
    }

    /// Serializes the query into the part of the URL after `?`.
    ///
    /// The comma-joined variable list comes first with no parameter name,
    /// followed by every constraint and then every function call, each as
    /// its own `&` segment. With `escape == false` segments are emitted raw.
    pub fn to_query_string(&self, escape: bool) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(
            1 + self.constraints.len() + self.server_side_functions.len(),
        );

        if !self.result_variables.is_empty() {
            let joined = self.result_variables.join(",");
            segments.push(if escape { quote_plus(&joined, "") } else { joined });
        }

        for item in self.constraints.iter().chain(&self.server_side_functions) {
            segments.push(if escape {
                quote_plus(item, EXPRESSION_SAFE)
            } else {
                item.clone()
            });
        }

        let query = segments.join("&");
        log::trace!("assembled query string: {}", query);
        query
    }
}
