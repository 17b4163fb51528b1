/// 规约模式的核心 trait
///
/// 用于封装可复用、可组合的查询/过滤条件；
/// 仓储的 `query`/`search` 以规约表达筛选语义。
pub trait Specification<T>: Send + Sync {
    /// 检查候选对象是否满足规约
    fn is_satisfied_by(&self, candidate: &T) -> bool;

    /// 与另一个规约进行 AND 组合
    fn and<S>(self, other: S) -> AndSpecification<Self, S>
    where
        Self: Sized,
        S: Specification<T>,
    {
        AndSpecification {
            left: self,
            right: other,
        }
    }

    /// 与另一个规约进行 OR 组合
    fn or<S>(self, other: S) -> OrSpecification<Self, S>
    where
        Self: Sized,
        S: Specification<T>,
    {
        OrSpecification {
            left: self,
            right: other,
        }
    }

    /// 对规约进行 NOT 操作
    fn not(self) -> NotSpecification<Self>
    where
        Self: Sized,
    {
        NotSpecification { inner: self }
    }
}

/// 闭包规约：以函数直接表达过滤条件
pub struct PredicateSpecification<P>(P);

impl<P> PredicateSpecification<P> {
    pub fn new(predicate: P) -> Self {
        Self(predicate)
    }
}

impl<T, P> Specification<T> for PredicateSpecification<P>
where
    P: Fn(&T) -> bool + Send + Sync,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        (self.0)(candidate)
    }
}

/// AND 组合规约：两个规约都满足时才满足
pub struct AndSpecification<L, R> {
    left: L,
    right: R,
}

impl<T, L, R> Specification<T> for AndSpecification<L, R>
where
    L: Specification<T>,
    R: Specification<T>,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) && self.right.is_satisfied_by(candidate)
    }
}

/// OR 组合规约：任意一个规约满足即满足
pub struct OrSpecification<L, R> {
    left: L,
    right: R,
}

impl<T, L, R> Specification<T> for OrSpecification<L, R>
where
    L: Specification<T>,
    R: Specification<T>,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        self.left.is_satisfied_by(candidate) || self.right.is_satisfied_by(candidate)
    }
}

/// NOT 规约：内部规约不满足时才满足
pub struct NotSpecification<S> {
    inner: S,
}

impl<T, S> Specification<T> for NotSpecification<S>
where
    S: Specification<T>,
{
    fn is_satisfied_by(&self, candidate: &T) -> bool {
        !self.inner.is_satisfied_by(candidate)
    }
}
