#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    And,
    Or,
}

impl BinOp {
    /// Comparison operator by its source symbol.
    pub fn comparison(symbol: &str) -> Option<BinOp> {
        match symbol.trim() {
            "==" => Some(BinOp::Equal),
            "!=" => Some(BinOp::NotEqual),
            "===" => Some(BinOp::StrictEqual),
            "!==" => Some(BinOp::StrictNotEqual),
            "<" => Some(BinOp::Less),
            "<=" => Some(BinOp::LessOrEqual),
            ">" => Some(BinOp::Greater),
            ">=" => Some(BinOp::GreaterOrEqual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Unary(UnaryOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
}

impl Expr {
    pub fn binary(lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
        Expr::Binary(Box::new(lhs), op, Box::new(rhs))
    }
}
