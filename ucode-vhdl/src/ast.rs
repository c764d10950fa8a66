//! The VHDL IR. One [`Design`] corresponds to one output file: an entity
//! declaration plus a single `behavior` architecture.

use ucode_utils::{GetName, Id};

/// The subset of VHDL types the generator emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    StdLogic,
    /// `std_logic_vector(msb downto lsb)`
    StdLogicVector { msb: u64, lsb: u64 },
    /// A reference to a locally declared type, e.g. the state enumeration.
    Named(Id),
}

impl Ty {
    /// A `std_logic_vector` of `width` bits indexed `width-1 downto 0`.
    pub fn vector(width: u64) -> Self {
        assert!(width > 0, "zero-width vector");
        Ty::StdLogicVector {
            msb: width - 1,
            lsb: 0,
        }
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::StdLogic => write!(f, "std_logic"),
            Ty::StdLogicVector { msb, lsb } => {
                write!(f, "std_logic_vector({} downto {})", msb, lsb)
            }
            Ty::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    In,
    Out,
    Inout,
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dir::In => write!(f, "in"),
            Dir::Out => write!(f, "out"),
            Dir::Inout => write!(f, "inout"),
        }
    }
}

/// A port on an entity or a declared component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: Id,
    pub dir: Dir,
    pub ty: Ty,
}

/// Expressions. Literal formatting follows VHDL: one-bit literals use
/// single quotes, bit-strings use double quotes MSB-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A signal, constant, or enumeration literal.
    Ref(Id),
    /// `'0'` or `'1'`.
    Bit(bool),
    /// A bit-string such as `"00000111"` or `"ZZZZZZZZ"`.
    Bits(String),
    /// `name(msb downto lsb)`.
    Slice { name: Id, msb: u64, lsb: u64 },
    /// `lhs = rhs`.
    Eq(Box<Expr>, Box<Expr>),
    /// A function call such as `rising_edge(clock)`.
    Call { func: Id, args: Vec<Expr> },
}

impl Expr {
    pub fn new_ref<S: Into<Id>>(name: S) -> Self {
        Expr::Ref(name.into())
    }

    pub fn new_bit(bit: bool) -> Self {
        Expr::Bit(bit)
    }

    pub fn new_bits<S: ToString>(bits: S) -> Self {
        Expr::Bits(bits.to_string())
    }

    pub fn new_slice<S: Into<Id>>(name: S, msb: u64, lsb: u64) -> Self {
        Expr::Slice {
            name: name.into(),
            msb,
            lsb,
        }
    }

    pub fn new_eq<L, R>(lhs: L, rhs: R) -> Self
    where
        L: Into<Expr>,
        R: Into<Expr>,
    {
        Expr::Eq(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn new_call<S: Into<Id>>(func: S, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: func.into(),
            args,
        }
    }
}

impl From<Id> for Expr {
    fn from(id: Id) -> Self {
        Expr::Ref(id)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::Ref(name.into())
    }
}

impl From<bool> for Expr {
    fn from(bit: bool) -> Self {
        Expr::Bit(bit)
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Ref(name) => write!(f, "{}", name),
            Expr::Bit(bit) => write!(f, "'{}'", u8::from(*bit)),
            Expr::Bits(bits) => write!(f, "\"{}\"", bits),
            Expr::Slice { name, msb, lsb } => {
                write!(f, "{}({} downto {})", name, msb, lsb)
            }
            Expr::Eq(lhs, rhs) => write!(f, "{} = {}", lhs, rhs),
            Expr::Call { func, args } => {
                write!(f, "{}(", func)?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Statements allowed inside a process body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sequential {
    /// `dst <= src;`
    Assign(Expr, Expr),
    If(SequentialIfElse),
    Case(Case),
}

impl Sequential {
    pub fn new_assign<L, R>(dst: L, src: R) -> Self
    where
        L: Into<Expr>,
        R: Into<Expr>,
    {
        Sequential::Assign(dst.into(), src.into())
    }
}

/// An `if .. elsif .. else .. end if;` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialIfElse {
    pub cond: Expr,
    pub then: Vec<Sequential>,
    pub elifs: Vec<(Expr, Vec<Sequential>)>,
    pub else_branch: Vec<Sequential>,
}

impl SequentialIfElse {
    pub fn new<E: Into<Expr>>(cond: E) -> Self {
        Self {
            cond: cond.into(),
            then: Vec::new(),
            elifs: Vec::new(),
            else_branch: Vec::new(),
        }
    }

    /// Append a statement to the `then` branch.
    pub fn add_seq(&mut self, stmt: Sequential) {
        self.then.push(stmt);
    }

    /// Append an `elsif` branch.
    pub fn add_elif<E: Into<Expr>>(
        &mut self,
        cond: E,
        body: Vec<Sequential>,
    ) {
        self.elifs.push((cond.into(), body));
    }

    pub fn set_else(&mut self, body: Vec<Sequential>) {
        self.else_branch = body;
    }
}

impl From<SequentialIfElse> for Sequential {
    fn from(ifelse: SequentialIfElse) -> Self {
        Sequential::If(ifelse)
    }
}

/// A `case .. is .. end case;` statement. The generator always emits
/// complete cases over an enumeration, so there is no `others` branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub discriminant: Expr,
    pub branches: Vec<CaseBranch>,
}

impl Case {
    pub fn new<E: Into<Expr>>(discriminant: E) -> Self {
        Self {
            discriminant: discriminant.into(),
            branches: Vec::new(),
        }
    }

    pub fn add_branch(&mut self, branch: CaseBranch) {
        self.branches.push(branch);
    }
}

impl From<Case> for Sequential {
    fn from(case: Case) -> Self {
        Sequential::Case(case)
    }
}

/// One `when <choice> =>` alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseBranch {
    pub choice: Id,
    pub body: Vec<Sequential>,
}

impl CaseBranch {
    pub fn new<S: Into<Id>>(choice: S) -> Self {
        Self {
            choice: choice.into(),
            body: Vec::new(),
        }
    }

    pub fn add_seq(&mut self, stmt: Sequential) {
        self.body.push(stmt);
    }
}

/// A process with an explicit sensitivity list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub sensitivity: Vec<Id>,
    pub body: Vec<Sequential>,
}

impl Process {
    pub fn new(sensitivity: Vec<Id>) -> Self {
        Self {
            sensitivity,
            body: Vec::new(),
        }
    }

    pub fn add_seq<S: Into<Sequential>>(&mut self, stmt: S) {
        self.body.push(stmt.into());
    }
}

/// A component instantiation with a positional port map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub label: Id,
    pub component: Id,
    pub port_map: Vec<Expr>,
}

impl Instance {
    pub fn new<L, C>(label: L, component: C) -> Self
    where
        L: Into<Id>,
        C: Into<Id>,
    {
        Self {
            label: label.into(),
            component: component.into(),
            port_map: Vec::new(),
        }
    }

    /// Connect the next port, in declaration order.
    pub fn connect<E: Into<Expr>>(&mut self, actual: E) {
        self.port_map.push(actual.into());
    }
}

/// Statements in the architecture body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Concurrent {
    /// `dst <= src;`
    Assign(Expr, Expr),
    Process(Process),
    Instance(Instance),
}

impl From<Process> for Concurrent {
    fn from(process: Process) -> Self {
        Concurrent::Process(process)
    }
}

impl From<Instance> for Concurrent {
    fn from(instance: Instance) -> Self {
        Concurrent::Instance(instance)
    }
}

/// A component declaration: the externally visible shape of a datapath
/// primitive or a generated entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: Id,
    pub ports: Vec<Port>,
}

impl Component {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
        }
    }

    pub fn add_port<S: Into<Id>>(&mut self, name: S, dir: Dir, ty: Ty) {
        self.ports.push(Port {
            name: name.into(),
            dir,
            ty,
        });
    }
}

/// Declarations in the architecture declarative part, kept in insertion
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    /// `type name is (a, b, c);`
    Type { name: Id, variants: Vec<Id> },
    /// `signal name : ty;`
    Signal { name: Id, ty: Ty },
    /// `constant name : ty := value;`
    Constant { name: Id, ty: Ty, value: Expr },
    Component(Component),
}

impl Decl {
    pub fn new_type<S: Into<Id>>(name: S, variants: Vec<Id>) -> Self {
        Decl::Type {
            name: name.into(),
            variants,
        }
    }

    pub fn new_signal<S: Into<Id>>(name: S, ty: Ty) -> Self {
        Decl::Signal {
            name: name.into(),
            ty,
        }
    }

    pub fn new_constant<S: Into<Id>, E: Into<Expr>>(
        name: S,
        ty: Ty,
        value: E,
    ) -> Self {
        Decl::Constant {
            name: name.into(),
            ty,
            value: value.into(),
        }
    }
}

impl From<Component> for Decl {
    fn from(component: Component) -> Self {
        Decl::Component(component)
    }
}

/// One output file: an entity and its `behavior` architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Design {
    pub name: Id,
    pub ports: Vec<Port>,
    pub decls: Vec<Decl>,
    pub stmts: Vec<Concurrent>,
}

impl Design {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            decls: Vec::new(),
            stmts: Vec::new(),
        }
    }

    pub fn add_input<S: Into<Id>>(&mut self, name: S, ty: Ty) {
        self.add_port(name, Dir::In, ty);
    }

    pub fn add_output<S: Into<Id>>(&mut self, name: S, ty: Ty) {
        self.add_port(name, Dir::Out, ty);
    }

    pub fn add_inout<S: Into<Id>>(&mut self, name: S, ty: Ty) {
        self.add_port(name, Dir::Inout, ty);
    }

    pub fn add_port<S: Into<Id>>(&mut self, name: S, dir: Dir, ty: Ty) {
        self.ports.push(Port {
            name: name.into(),
            dir,
            ty,
        });
    }

    pub fn add_decl<D: Into<Decl>>(&mut self, decl: D) {
        self.decls.push(decl.into());
    }

    pub fn add_stmt<C: Into<Concurrent>>(&mut self, stmt: C) {
        self.stmts.push(stmt.into());
    }

    /// Concurrent `dst <= src;` in the architecture body.
    pub fn add_assign<L, R>(&mut self, dst: L, src: R)
    where
        L: Into<Expr>,
        R: Into<Expr>,
    {
        self.stmts.push(Concurrent::Assign(dst.into(), src.into()));
    }
}

impl GetName for Design {
    fn name(&self) -> Id {
        self.name
    }
}
